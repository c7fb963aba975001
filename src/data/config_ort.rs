//! Options for building the ONNX Runtime detector.

use std::path::{Path, PathBuf};
use crate::common::{
    ClassVocabulary, DevicePreference, ModelConfig, DEFAULT_CONF_THRESHOLD, DEFAULT_INPUT_SIZE,
    DEFAULT_RESCALE_SIZE,
};

#[derive(Debug, Clone)]
pub struct ConfigOrt {
    pub onnx_path: PathBuf,
    pub device: DevicePreference,
    pub input_size: u32,
    pub rescale_size: u32,
    pub pad_value: u8,
    pub reverse_channels: bool,
    pub normalize: bool,
    pub profile: bool,

    pub names: ClassVocabulary,
    pub conf: f32,
}

impl Default for ConfigOrt {
    fn default() -> Self {
        Self {
            onnx_path: PathBuf::new(),
            device: DevicePreference::Auto,
            input_size: DEFAULT_INPUT_SIZE,
            rescale_size: DEFAULT_RESCALE_SIZE,
            pad_value: 114,
            reverse_channels: true,
            normalize: true,
            profile: false,

            names: ClassVocabulary::parking(),
            conf: DEFAULT_CONF_THRESHOLD,
        }
    }
}

impl From<&ModelConfig> for ConfigOrt {
    fn from(config: &ModelConfig) -> Self {
        ConfigOrt::new()
            .with_model(&config.weights_path)
            .with_names(config.vocabulary.clone())
            .with_device(config.device)
            .with_conf(config.conf_threshold)
            .with_input_size(config.input_size, config.rescale_size)
            .with_reverse_channels(config.reverse_channels)
            .with_profile(config.profile)
    }
}

impl ConfigOrt {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_model<P: AsRef<Path>>(mut self, onnx_path: P) -> Self {
        self.onnx_path = onnx_path.as_ref().to_path_buf();
        self
    }

    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    pub fn with_input_size(mut self, input_size: u32, rescale_size: u32) -> Self {
        self.input_size = input_size;
        self.rescale_size = rescale_size.min(input_size);
        self
    }

    pub fn with_reverse_channels(mut self, x: bool) -> Self {
        self.reverse_channels = x;
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_names(mut self, names: ClassVocabulary) -> Self {
        self.names = names;
        self
    }

    pub fn with_conf(mut self, x: f32) -> Self {
        self.conf = x;
        self
    }
}
