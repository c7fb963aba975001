//! The single capability the pipeline needs from a detection model.

use std::path::Path;
use crate::common::{ClassVocabulary, DevicePreference, InferenceDevice, ModelConfig, RawDetections, SpotError,
                    SpotImage, SpotResult};
use crate::data::ConfigOrt;
use crate::detection_processing::filter_by_confidence;
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::ort_detector::OrtYoloNas;

/// A loaded detection model.
///
/// Implementations run one forward pass and report the surviving candidates in
/// emission order, with any suppression the model performs left untouched.
pub trait Predictor: Send {
    fn predict(&mut self, image: &SpotImage, threshold: f32) -> SpotResult<RawDetections>;

    /// Device the model was bound to at load time.
    fn device(&self) -> InferenceDevice {
        InferenceDevice::CPU
    }
}

/// Loads the checkpoint at `checkpoint_path` for `vocabulary`.
///
/// Fails with `ModelLoad` when the file is missing, unreadable, not a supported
/// export, or declares a class count different from the vocabulary's.
pub fn load<P: AsRef<Path>>(
    checkpoint_path: P,
    vocabulary: &ClassVocabulary,
    device: DevicePreference,
) -> SpotResult<Box<dyn Predictor>> {
    let config = ModelConfig::new(checkpoint_path.as_ref(), vocabulary.clone()).with_device(device);
    load_with(&config)
}

pub fn load_with(config: &ModelConfig) -> SpotResult<Box<dyn Predictor>> {
    if config.vocabulary.is_empty() {
        return Err(SpotError::ModelLoad("class vocabulary must not be empty".to_string()));
    }
    let model = OrtYoloNas::new(ConfigOrt::from(config))
        .map_err(|err| SpotError::model_load(format!("{}: {err:#}", config.weights_path.display())))?;
    Ok(Box::new(model))
}

/// Runs a forward pass and keeps only candidates with confidence strictly above `threshold`.
///
/// The filter is applied here regardless of what the predictor already dropped.
pub fn infer(model: &mut dyn Predictor, image: &SpotImage, threshold: f32) -> SpotResult<RawDetections> {
    let raw = model.predict(image, threshold)?;
    Ok(filter_by_confidence(raw, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SpotBox;

    struct Fixed(RawDetections);

    impl Predictor for Fixed {
        fn predict(&mut self, _image: &SpotImage, _threshold: f32) -> SpotResult<RawDetections> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn infer_drops_candidates_at_or_below_threshold() {
        let raw: RawDetections = vec![
            (0, 0.39, SpotBox::new(0., 0., 1., 1.)),
            (1, 0.40, SpotBox::new(0., 0., 1., 1.)),
            (2, 0.41, SpotBox::new(0., 0., 1., 1.)),
        ]
        .into_iter()
        .collect();
        let mut model = Fixed(raw);
        let out = infer(&mut model, &SpotImage::default(), 0.4).unwrap();
        assert_eq!(out.labels(), &[2]);
    }

    #[test]
    fn missing_checkpoint_is_a_model_load_error() {
        let err = load("/nonexistent/ckpt_best.onnx", &ClassVocabulary::parking(), DevicePreference::Auto)
            .err()
            .unwrap();
        assert!(matches!(err, SpotError::ModelLoad(_)));
    }
}
