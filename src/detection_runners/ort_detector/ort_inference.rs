//! YOLO-NAS adapter over [`OrtEngine`].

use std::time::Duration;
use anyhow::Result;
use regex::Regex;

use crate::common::{InferenceDevice, RawDetections, SpotError, SpotImage, SpotResult};
use crate::data::ConfigOrt;
use crate::detection_processing::filter_by_confidence;
use crate::detection_runners::image_ops::{ImageOps, LetterboxInfo};
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::input_wrapper::{Xs, X};
use crate::detection_runners::ort_detector::{OrtEngine, OutputLayout};
use crate::detection_runners::predictor::Predictor;

#[derive(Debug)]
pub struct OrtYoloNas {
    engine: OrtEngine,
    ops: ImageOps,
    layout: OutputLayout,
    profile: bool,
}

impl InferenceProcess for OrtYoloNas {
    type Input = SpotImage;

    fn new(options: ConfigOrt) -> Result<Self> {
        let engine = OrtEngine::new(&options)?;
        let layout = OutputLayout::from_output_count(engine.out_names().len())?;

        // Class names embedded by the exporter must agree with the configured vocabulary
        if let Some(names_parsed) = Self::fetch_names(&engine) {
            if names_parsed.len() != options.names.len() {
                anyhow::bail!(
                    "The checkpoint declares {} classes but the vocabulary has {}: {:?}",
                    names_parsed.len(),
                    options.names.len(),
                    options.names.names(),
                );
            }
        }

        let ops = ImageOps {
            input_size: options.input_size,
            rescale_size: options.rescale_size,
            pad_value: options.pad_value,
            reverse_channels: options.reverse_channels,
            normalize: options.normalize,
        };

        log::info!(
            "YOLO-NAS | Layout: {:?} | Classes: {} | Input: {}x{} | Threshold: {}",
            layout,
            options.names.len(),
            options.input_size,
            options.input_size,
            options.conf,
        );

        Ok(Self {
            engine,
            ops,
            layout,
            profile: options.profile,
        })
    }

    fn preprocess(&self, x: &Self::Input) -> Result<(X, LetterboxInfo)> {
        self.ops.apply(&x.image)
    }

    fn inference(&mut self, x: X) -> Result<Xs> {
        self.engine.engine_run(x)
    }

    fn postprocess(&self, xs: Xs, info: &LetterboxInfo, threshold: f32) -> Result<RawDetections> {
        let raw = self.layout.decode(&xs, info)?;
        Ok(filter_by_confidence(raw, threshold))
    }

    fn record_time(&mut self, stages: &[Duration]) {
        self.engine.infer_time.record(stages);
    }

    fn print_time(&self) {
        let ts = self.engine.ts();
        log::info!(
            "[Profile] avg over {} calls: {:?} (pre {:?} | run {:?} | post {:?})",
            ts.n(),
            ts.avg(),
            ts.avg_i(0),
            ts.avg_i(1),
            ts.avg_i(2),
        );
    }
}

impl Predictor for OrtYoloNas {
    fn predict(&mut self, image: &SpotImage, threshold: f32) -> SpotResult<RawDetections> {
        let profile = self.profile;
        self.forward(image, threshold, profile).map_err(|err| {
            log::error!("Forward pass failed on {}: {err:#}", self.engine.device());
            SpotError::inference(format!("{err:#}"))
        })
    }

    fn device(&self) -> InferenceDevice {
        *self.engine.device()
    }
}

impl OrtYoloNas {
    fn fetch_names(engine: &OrtEngine) -> Option<Vec<String>> {
        // String format: `{0: 'free_parking_space', 1: 'not_free_parking_space', ...}`
        engine.try_fetch("names").map(|names| parse_names(&names))
    }
}

fn parse_names(names: &str) -> Vec<String> {
    let re = match Regex::new(r#"(['"])([-()\w '"]+)(['"])"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    re.captures_iter(names)
        .map(|x| x.extract())
        .map(|(_, [_, name, _])| name.to_string())
        .collect()
}
