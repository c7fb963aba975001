mod ort_engine;
mod ort_inference;
mod output_layout;
pub mod image_ops;
pub mod input_wrapper;

pub use ort_engine::*;
pub use ort_inference::*;
pub use output_layout::*;
