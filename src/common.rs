mod class_vocabulary;
mod errors;
mod inference_device;
mod model_config;
mod output_mode;
mod raw_detections;
mod spot_box;
mod spot_detection;
mod spot_image;

pub use class_vocabulary::*;
pub use errors::*;
pub use inference_device::*;
pub use model_config::*;
pub use output_mode::*;
pub use raw_detections::*;
pub use spot_box::*;
pub use spot_detection::*;
pub use spot_image::*;
