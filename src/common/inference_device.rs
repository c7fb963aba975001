use crate::common::{SpotError, SpotResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InferenceDevice {
    #[default] CPU,
    CUDA(usize),
    TensorRT(usize),
    CoreML(usize),
}

// Hardcoded device names. Storing the "proper" spelling and the lowercase version.
const CPU: [&str; 2] = ["CPU","cpu"];
const CUDA: [&str; 2] = ["CUDA","cuda"];
const TENSOR_RT: [&str; 2] = ["TensorRT","tensorrt"];
const CORE_ML: [&str; 2] = ["CoreML","coreml"];

impl InferenceDevice {
    pub fn from_str(device: &str, device_id: usize) -> Option<Self> {
        match device.to_lowercase().as_str() {
            "cpu" => Some(InferenceDevice::CPU),
            "cuda" => Some(InferenceDevice::CUDA(device_id)),
            "tensorrt" => Some(InferenceDevice::TensorRT(device_id)),
            "coreml" => Some(InferenceDevice::CoreML(device_id)),
            _ => None,
        }
    }

    pub fn str(&self) -> &'static str {
        match self {
            InferenceDevice::CPU => CPU[0],
            InferenceDevice::CUDA(_) => CUDA[0],
            InferenceDevice::TensorRT(_) => TENSOR_RT[0],
            InferenceDevice::CoreML(_) => CORE_ML[0],
        }
    }

    /// Accelerators run one forward pass at a time; only the CPU may host several model slots.
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, InferenceDevice::CPU)
    }

    pub fn all_inference_devices() -> Vec<&'static str> {
        vec![CPU[1], CUDA[1], TENSOR_RT[1], CORE_ML[1]]
    }
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceDevice::CPU => write!(f, "{}", self.str()),
            InferenceDevice::CUDA(id) | InferenceDevice::TensorRT(id) | InferenceDevice::CoreML(id) => {
                write!(f, "{}:{}", self.str(), id)
            }
        }
    }
}

/// Which device the loader should try first.
///
/// `Auto` prefers CUDA and falls back to the CPU; it is resolved once, when the
/// model is loaded, never per request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    #[default] Auto,
    Explicit(InferenceDevice),
}

impl DevicePreference {
    /// Parses `auto`, `cpu`, `cuda`, `cuda:1`, `tensorrt:0`, `coreml`.
    pub fn parse(value: &str) -> SpotResult<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("auto") || value.is_empty() {
            return Ok(DevicePreference::Auto);
        }
        let (name, id) = match value.split_once(':') {
            Some((name, id)) => {
                let id = id.parse::<usize>()
                    .map_err(|_| SpotError::Config(format!("invalid device id in {value:?}")))?;
                (name, id)
            }
            None => (value, 0),
        };
        InferenceDevice::from_str(name, id)
            .map(DevicePreference::Explicit)
            .ok_or_else(|| SpotError::Config(format!(
                "unknown device {value:?}, expected auto or one of {:?}",
                InferenceDevice::all_inference_devices()
            )))
    }
}
