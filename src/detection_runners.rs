pub mod inference_process;
pub mod ort_detector;
pub mod predictor;

pub use ort_detector::*;
pub use predictor::*;
