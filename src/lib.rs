//! Parking-space occupancy detection: load a YOLO-NAS checkpoint once, then turn
//! uploaded images into an annotated PNG or an index-keyed JSON mapping.

mod utils;
pub mod common;
pub mod data;
pub mod detection_processing;
pub mod detection_runners;
pub mod detector;
pub mod rendering;

pub use common::{ClassVocabulary, Detection, DetectionSet, ModelConfig, OutputMode, RawDetections, SpotError,
                 SpotResult};
pub use detection_processing::postprocess;
pub use detection_runners::{infer, load, Predictor};
pub use detector::{global, init_global, install_global, CancelToken, SpotDetector};
pub use rendering::{to_json, Artifact};

/// Runs one upload through the process-wide detector.
///
/// `output_mode` is `"overlay"` or `"json"`. Fails with `ModelLoad` when
/// [`init_global`] has not completed.
pub fn process_image(image_bytes: &[u8], output_mode: &str) -> SpotResult<Artifact> {
    let mode: OutputMode = output_mode.parse()?;
    let detector = global()
        .ok_or_else(|| SpotError::ModelLoad("detector has not been initialized".to_string()))?;
    detector.process_image(image_bytes, mode)
}

/// Draws `detections` on a copy of `source` with the default renderer, as PNG bytes.
pub fn render_overlay(source: &image::RgbImage, detections: &DetectionSet) -> SpotResult<Vec<u8>> {
    match global() {
        Some(detector) => detector.renderer().render_overlay(source, detections),
        None => rendering::OverlayRenderer::default().render_overlay(source, detections),
    }
}
