use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use crate::common::{ClassVocabulary, DevicePreference, SpotError, SpotResult};
use crate::data::FsAccess;

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.4;
pub const DEFAULT_INPUT_SIZE: u32 = 640;
/// Longest image side after rescaling; the rest of the input is padding.
pub const DEFAULT_RESCALE_SIZE: u32 = 636;
pub const DEFAULT_CHECKPOINT_NAME: &str = "ckpt_best.onnx";

/// Everything the pipeline needs, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub weights_path: PathBuf,
    pub vocabulary: ClassVocabulary,
    pub device: DevicePreference,
    pub conf_threshold: f32,
    pub input_size: u32,
    pub rescale_size: u32,
    pub reverse_channels: bool,
    pub cpu_workers: usize,
    pub font_path: Option<PathBuf>,
    pub profile: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: FsAccess::Cache.file_path(DEFAULT_CHECKPOINT_NAME),
            vocabulary: ClassVocabulary::parking(),
            device: DevicePreference::Auto,
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            input_size: DEFAULT_INPUT_SIZE,
            rescale_size: DEFAULT_RESCALE_SIZE,
            reverse_channels: true,
            cpu_workers: 1,
            font_path: None,
            profile: false,
        }
    }
}

impl ModelConfig {
    pub fn new<P: Into<PathBuf>>(weights_path: P, vocabulary: ClassVocabulary) -> Self {
        Self {
            weights_path: weights_path.into(),
            vocabulary,
            ..Default::default()
        }
    }

    /// Defaults overridden by `SPOT_*` environment variables.
    ///
    /// A variable that is set but unparsable is a configuration error rather
    /// than silently falling back to the default.
    pub fn from_env() -> SpotResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var("SPOT_MODEL_PATH") {
            config.weights_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("SPOT_LABELS_PATH") {
            config.vocabulary = ClassVocabulary::from_file(path)?;
        }
        if let Ok(device) = env::var("SPOT_DEVICE") {
            config.device = DevicePreference::parse(&device)?;
        }
        if let Some(x) = env_parse::<f32>("SPOT_CONF_THRESHOLD")? {
            config.conf_threshold = x;
        }
        if let Some(x) = env_parse::<u32>("SPOT_INPUT_SIZE")? {
            config.input_size = x;
            config.rescale_size = config.rescale_size.min(x);
        }
        if let Some(x) = env_parse::<usize>("SPOT_CPU_WORKERS")? {
            config.cpu_workers = x;
        }
        if let Ok(path) = env::var("SPOT_FONT_PATH") {
            config.font_path = Some(PathBuf::from(path));
        }
        if let Some(x) = env_parse::<bool>("SPOT_PROFILE")? {
            config.profile = x;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_threshold(mut self, conf_threshold: f32) -> Self {
        self.conf_threshold = conf_threshold;
        self
    }

    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    pub fn with_cpu_workers(mut self, n: usize) -> Self {
        self.cpu_workers = n;
        self
    }

    pub fn with_font_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> SpotResult<()> {
        if !(0.0..1.0).contains(&self.conf_threshold) {
            return Err(SpotError::Config(format!(
                "confidence threshold must be in [0, 1), got {}",
                self.conf_threshold
            )));
        }
        if self.vocabulary.is_empty() {
            return Err(SpotError::Config("class vocabulary must not be empty".to_string()));
        }
        if self.input_size == 0 || self.rescale_size == 0 || self.rescale_size > self.input_size {
            return Err(SpotError::Config(format!(
                "invalid model input geometry: rescale {} into {}",
                self.rescale_size, self.input_size
            )));
        }
        if self.cpu_workers == 0 {
            return Err(SpotError::Config("cpu_workers must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!("Weights File Path: {}\n\
        Classes: {:?}\n\
        Device Preference: {:?}\n\
        Model Input Resolution: {}x{} (rescale {})\n\
        Detection Threshold: {}\n\
        CPU Workers: {}",
                self.weights_path.display(), self.vocabulary.names(), self.device,
                self.input_size, self.input_size, self.rescale_size,
                self.conf_threshold, self.cpu_workers)
    }
}

fn env_parse<T: FromStr>(key: &str) -> SpotResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SpotError::Config(format!("{key}={raw:?} is not a valid value"))),
        Err(_) => Ok(None),
    }
}
