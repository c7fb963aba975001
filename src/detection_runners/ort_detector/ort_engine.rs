//! ONNX Runtime session wrapper: checkpoint loading, device selection and dtype alignment.

use anyhow::Result;
use half::{bf16, f16};
use ndarray::{Array, IxDyn};
use ort::{
    execution_providers::{ExecutionProvider,
                          CPUExecutionProvider,
                          CUDAExecutionProvider,
                          TensorRTExecutionProvider,
                          CoreMLExecutionProvider},
    session::builder::{GraphOptimizationLevel, SessionBuilder},
    session::Session,
    tensor::TensorElementType,
    value::{DynValue, Value, ValueType},
};
use crate::common::{DevicePreference, InferenceDevice};
use crate::data::{ConfigOrt, FsAccess, TimeCalc, CROSS_MARK};
use crate::detection_runners::input_wrapper::{Xs, X};
use crate::utils::human_bytes;

/// Names and element types of a session's inputs or outputs.
#[derive(Debug, Clone, Default)]
pub struct OrtTensorAttr {
    pub names: Vec<String>,
    pub dtypes: Vec<TensorElementType>,
}

/// ONNXRuntime Backend
#[derive(Debug)]
pub struct OrtEngine {
    session: Session,
    device: InferenceDevice,
    inputs_attrs: OrtTensorAttr,
    outputs_attrs: OrtTensorAttr,
    pub infer_time: TimeCalc,
}

impl OrtEngine {
    pub fn new(config: &ConfigOrt) -> Result<Self> {
        let onnx_path = &config.onnx_path;
        if !onnx_path.is_file() {
            anyhow::bail!("{CROSS_MARK} Checkpoint not found: {}", onnx_path.display());
        }
        let file_size = std::fs::metadata(onnx_path)?.len();

        // Environment is process wide; a second commit is a no-op.
        let _ = ort::init().with_name("spot_detect").commit();

        let mut builder = Session::builder()?;
        let device = Self::register_device(&mut builder, config.device)?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(onnx_path)?;

        let inputs_attrs = OrtTensorAttr {
            names: session.inputs.iter().map(|x| x.name.clone()).collect(),
            dtypes: session.inputs.iter().map(|x| Self::tensor_dtype(&x.input_type)).collect::<Result<_>>()?,
        };
        let outputs_attrs = OrtTensorAttr {
            names: session.outputs.iter().map(|x| x.name.clone()).collect(),
            dtypes: session.outputs.iter().map(|x| Self::tensor_dtype(&x.output_type)).collect::<Result<_>>()?,
        };
        if inputs_attrs.names.len() != 1 {
            anyhow::bail!(
                "{CROSS_MARK} Expected a single image input, found {:?}",
                inputs_attrs.names
            );
        }

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Checkpoint: {} ({}) | Inputs: {:?} | Outputs: {:?}",
            device,
            onnx_path.display(),
            human_bytes(file_size as f64),
            inputs_attrs.names,
            outputs_attrs.names,
        );

        Ok(Self {
            session,
            device,
            inputs_attrs,
            outputs_attrs,
            infer_time: TimeCalc::default(),
        })
    }

    /// Resolves the device preference once; unavailable CUDA/CoreML fall back to the CPU.
    fn register_device(builder: &mut SessionBuilder, preference: DevicePreference) -> Result<InferenceDevice> {
        let requested = match preference {
            DevicePreference::Auto => InferenceDevice::CUDA(0),
            DevicePreference::Explicit(device) => device,
        };

        let mut device = requested;
        match requested {
            InferenceDevice::TensorRT(device_id) => Self::build_trt(builder, device_id)?,
            InferenceDevice::CUDA(device_id) => {
                Self::build_cuda(builder, device_id).unwrap_or_else(|err| {
                    log::warn!("{err}, Using cpu");
                    device = InferenceDevice::CPU;
                })
            }
            InferenceDevice::CoreML(_) => Self::build_coreml(builder).unwrap_or_else(|err| {
                log::warn!("{err}, Using cpu");
                device = InferenceDevice::CPU;
            }),
            InferenceDevice::CPU => {}
        }
        if device == InferenceDevice::CPU {
            Self::build_cpu(builder)?;
        }
        Ok(device)
    }

    fn build_trt(builder: &mut SessionBuilder, device_id: usize) -> Result<()> {
        let cache_dir = FsAccess::Cache.file_path("trt-cache");
        let trt = TensorRTExecutionProvider::default()
            .with_device_id(device_id as i32)
            .with_fp16(false)
            .with_engine_cache(true)
            .with_engine_cache_path(cache_dir.display().to_string())
            .with_timing_cache(false);
        if trt.is_available()? {
            match trt.register(builder) {
                Ok(_) => { }
                Err(err) => { anyhow::bail!("{CROSS_MARK} TensorRT initialization failed: {:?}", err) }
            }
            log::info!("🐢 Initial model serialization with TensorRT may takes some time...");
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} TensorRT execution provider not available")
        }
    }

    fn build_cuda(builder: &mut SessionBuilder, device_id: usize) -> Result<()> {
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32);
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => { }
                Err(err) => { anyhow::bail!("{CROSS_MARK} CUDA initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CUDA execution provider not available")
        }
    }

    fn build_coreml(builder: &mut SessionBuilder) -> Result<()> {
        let ep = CoreMLExecutionProvider::default()
            .with_subgraphs(false);
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => { }
                Err(err) => { anyhow::bail!("{CROSS_MARK} CoreML initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CoreML execution provider not available")
        }
    }

    fn build_cpu(builder: &mut SessionBuilder) -> Result<()> {
        let ep = CPUExecutionProvider::default();
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => { }
                Err(err) => { anyhow::bail!("{CROSS_MARK} CPU initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CPU execution provider not available")
        }
    }

    fn tensor_dtype(value_type: &ValueType) -> Result<TensorElementType> {
        match value_type {
            ValueType::Tensor { ty, .. } => Ok(*ty),
            other => anyhow::bail!("Only tensor inputs and outputs are supported, found {:?}", other),
        }
    }

    fn tensor_preprocess(x: X, dtype: &TensorElementType) -> Result<DynValue> {
        let x = match dtype {
            TensorElementType::Float32 => Value::from_array(x.0)?.into_dyn(),
            TensorElementType::Float16 => Value::from_array(x.mapv(f16::from_f32))?.into_dyn(),
            TensorElementType::Bfloat16 => Value::from_array(x.mapv(bf16::from_f32))?.into_dyn(),
            TensorElementType::Uint8 => Value::from_array(x.mapv(|x_| x_ as u8))?.into_dyn(),
            _ => anyhow::bail!("Unsupported ort input tensor type: {:?}", dtype),
        };
        Ok(x)
    }

    fn tensor_postprocess(x: &DynValue, dtype: &TensorElementType) -> Result<Array<f32, IxDyn>> {
        fn _extract_and_convert<T>(x: &DynValue, map_fn: impl Fn(T) -> f32) -> Result<Array<f32, IxDyn>>
        where
            T: Clone + 'static + ort::tensor::PrimitiveTensorElementType,
        {
            let view = x.try_extract_array::<T>()?;
            Ok(view.mapv(map_fn))
        }
        let x = match dtype {
            TensorElementType::Float32 => _extract_and_convert::<f32>(x, |x| x)?,
            TensorElementType::Float16 => _extract_and_convert::<f16>(x, f16::to_f32)?,
            TensorElementType::Bfloat16 => _extract_and_convert::<bf16>(x, bf16::to_f32)?,
            TensorElementType::Float64 => _extract_and_convert::<f64>(x, |x| x as f32)?,
            TensorElementType::Int64 => _extract_and_convert::<i64>(x, |x| x as f32)?,
            TensorElementType::Int32 => _extract_and_convert::<i32>(x, |x| x as f32)?,
            TensorElementType::Int16 => _extract_and_convert::<i16>(x, |x| x as f32)?,
            TensorElementType::Int8 => _extract_and_convert::<i8>(x, |x| x as f32)?,
            TensorElementType::Uint8 => _extract_and_convert::<u8>(x, |x| x as f32)?,
            _ => return Err(anyhow::anyhow!("Unsupported ort tensor type: {:?}", dtype)),
        };

        Ok(x)
    }

    /// Runs one forward pass, returning every output converted to f32 in session order.
    pub fn engine_run(&mut self, x: X) -> Result<Xs> {
        let value = Self::tensor_preprocess(x, &self.inputs_attrs.dtypes[0])?;
        let outputs = self
            .session
            .run(ort::inputs![self.inputs_attrs.names[0].as_str() => value])?;

        let mut ys = Xs::new();
        for (dtype, name) in self.outputs_attrs.dtypes.iter().zip(self.outputs_attrs.names.iter()) {
            let y = Self::tensor_postprocess(&outputs[name.as_str()], dtype)?;
            ys.push_kv(name.as_str(), X::from(y));
        }

        Ok(ys)
    }

    pub fn out_names(&self) -> &Vec<String> {
        &self.outputs_attrs.names
    }

    pub fn device(&self) -> &InferenceDevice {
        &self.device
    }

    pub fn try_fetch(&self, key: &str) -> Option<String> {
        match self.session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom(key).unwrap_or_default(),
        }
    }

    pub fn ts(&self) -> &TimeCalc {
        &self.infer_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checkpoint_fails_before_touching_the_runtime() {
        let config = ConfigOrt::new().with_model("/nonexistent/ckpt_best.onnx");
        let err = OrtEngine::new(&config).unwrap_err();
        assert!(err.to_string().contains("Checkpoint not found"));
    }
}
