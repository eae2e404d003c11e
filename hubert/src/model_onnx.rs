//! [`UnitModel`] implementation using ONNX Runtime.

use std::borrow::Cow;
use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array3, ArrayView2, ArrayView3, Dimension, Ix3};
use once_cell::sync::OnceCell;
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;
use tracing::{debug, info, warn};

use crate::device::{Device, DeviceProbe};
use crate::model::{ModelLoader, UnitModel};
use crate::HubertError;

static RUNTIME: OnceCell<Result<(), String>> = OnceCell::new();

/// Initializes the process-wide ONNX Runtime environment once.
///
/// A failed init is remembered and reported by every later call.
fn init_runtime() -> Result<(), HubertError> {
    RUNTIME
        .get_or_init(|| match ort::init().with_name("diffsvc-hubert").commit() {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "hubert: onnx runtime init failed");
                Err(e.to_string())
            }
        })
        .clone()
        .map_err(|e| HubertError::ModelLoad(format!("onnx runtime init: {e}")))
}

fn load_err(e: impl Display) -> HubertError {
    HubertError::ModelLoad(e.to_string())
}

fn inference_err(e: impl Display) -> HubertError {
    HubertError::Inference(e.to_string())
}

/// Graph signature of an exported unit model.
///
/// The soft export takes `[1, 1, N]`, the vec export `[1, N]`; both
/// produce `[1, T, 256]`.
#[derive(Debug, Clone)]
pub struct OnnxModelConfig {
    /// Input name for the soft path (default: "source").
    pub soft_input: String,
    /// Output name for the soft path (default: "units").
    pub soft_output: String,
    /// Input name for the vec path (default: "source").
    pub vec_input: String,
    /// Output name for the vec path (default: "units").
    pub vec_output: String,
    /// Intra-op threads, 0 for the runtime default.
    pub intra_threads: usize,
}

impl Default for OnnxModelConfig {
    fn default() -> Self {
        Self {
            soft_input: "source".to_string(),
            soft_output: "units".to_string(),
            vec_input: "source".to_string(),
            vec_output: "units".to_string(),
            intra_threads: 0,
        }
    }
}

fn open_session(path: &Path, device: Device, cfg: &OnnxModelConfig) -> Result<Session, HubertError> {
    let mut builder = Session::builder()
        .map_err(load_err)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(load_err)?;

    if cfg.intra_threads > 0 {
        builder = builder.with_intra_threads(cfg.intra_threads).map_err(load_err)?;
    }

    if let Device::Cuda(id) = device {
        let cuda = CUDAExecutionProvider::default()
            .with_device_id(id as i32)
            .build()
            .error_on_failure();
        builder = builder.with_execution_providers([cuda]).map_err(load_err)?;
    }

    builder.commit_from_file(path).map_err(load_err)
}

/// Runs `open` on `device`, retrying once on CPU if an accelerator fails.
///
/// Returns the value together with the device it was opened on.
fn with_cpu_fallback<T>(
    device: Device,
    mut open: impl FnMut(Device) -> Result<T, HubertError>,
) -> Result<(T, Device), HubertError> {
    match open(device) {
        Ok(value) => Ok((value, device)),
        Err(e) if device.is_accelerated() => {
            warn!(%device, error = %e, "hubert: accelerator unusable, falling back to cpu");
            Ok((open(Device::Cpu)?, Device::Cpu))
        }
        Err(e) => Err(e),
    }
}

/// [`UnitModel`] running an exported HuBERT graph.
///
/// `Session::run` needs exclusive access, so calls are serialized
/// through a mutex.
pub struct OnnxModel {
    session: Mutex<Session>,
    device: Device,
    cfg: OnnxModelConfig,
}

impl OnnxModel {
    /// Loads a `.onnx` file, placing it on CUDA when `device` asks for it.
    ///
    /// If the CUDA provider cannot be registered (no usable GPU on the
    /// host), the session is built on CPU instead and [`UnitModel::device`]
    /// reports [`Device::Cpu`].
    pub fn from_file(path: &Path, device: Device, cfg: OnnxModelConfig) -> Result<Self, HubertError> {
        init_runtime()?;

        let (session, device) = with_cpu_fallback(device, |dev| open_session(path, dev, &cfg))?;
        info!(path = %path.display(), %device, "hubert: onnx session ready");

        Ok(Self {
            session: Mutex::new(session),
            device,
            cfg,
        })
    }

    fn run<D: Dimension + 'static>(
        &self,
        input_name: &str,
        output_name: &str,
        input: ndarray::Array<f32, D>,
    ) -> Result<Array3<f32>, HubertError> {
        debug!(input = input_name, shape = ?input.shape(), "hubert: onnx run");
        let tensor = Tensor::from_array(input).map_err(inference_err)?;
        let inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            vec![(Cow::Borrowed(input_name), tensor.into_dyn().into())];

        let mut session = self
            .session
            .lock()
            .map_err(|_| HubertError::Inference("session lock poisoned".into()))?;
        let outputs = session
            .run(SessionInputs::from(inputs))
            .map_err(inference_err)?;

        let output = outputs
            .get(output_name)
            .ok_or_else(|| HubertError::Inference(format!("model has no output {output_name:?}")))?;
        let array = output.try_extract_array::<f32>().map_err(inference_err)?;
        array
            .to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|e| HubertError::Inference(format!("unexpected output rank: {e}")))
    }
}

impl UnitModel for OnnxModel {
    fn soft_units(&self, wav: ArrayView3<'_, f32>) -> Result<Array3<f32>, HubertError> {
        self.run(&self.cfg.soft_input, &self.cfg.soft_output, wav.to_owned())
    }

    fn vec_units(&self, wav: ArrayView2<'_, f32>) -> Result<Array3<f32>, HubertError> {
        self.run(&self.cfg.vec_input, &self.cfg.vec_output, wav.to_owned())
    }

    fn device(&self) -> Device {
        self.device
    }
}

/// [`ModelLoader`] producing [`OnnxModel`]s.
#[derive(Debug, Clone, Default)]
pub struct OnnxLoader {
    cfg: OnnxModelConfig,
}

impl OnnxLoader {
    pub fn new(cfg: OnnxModelConfig) -> Self {
        Self { cfg }
    }
}

impl ModelLoader for OnnxLoader {
    fn load(&self, checkpoint: &Path, device: Device) -> Result<Box<dyn UnitModel>, HubertError> {
        Ok(Box::new(OnnxModel::from_file(checkpoint, device, self.cfg.clone())?))
    }
}

/// Reports whether the linked ONNX Runtime has the CUDA provider.
///
/// This says nothing about the host's GPU; [`OnnxModel::from_file`]
/// drops to CPU when the provider fails to register. Without the
/// `cuda` feature the downloaded runtime is CPU-only and this is false.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxCudaProbe;

impl DeviceProbe for OnnxCudaProbe {
    fn accelerator_available(&self) -> bool {
        if init_runtime().is_err() {
            return false;
        }
        CUDAExecutionProvider::default().is_available().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_signature() {
        let cfg = OnnxModelConfig::default();
        assert_eq!(cfg.soft_input, "source");
        assert_eq!(cfg.soft_output, "units");
        assert_eq!(cfg.intra_threads, 0);
    }

    #[test]
    fn corrupt_checkpoint_is_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hubert_soft.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let err = OnnxLoader::default().load(&path, Device::Cpu).err().unwrap();
        assert!(matches!(err, HubertError::ModelLoad(_)));
    }

    #[test]
    fn runtime_init_is_remembered() {
        let first = init_runtime().is_ok();
        assert_eq!(init_runtime().is_ok(), first);
        assert!(RUNTIME.get().is_some());
    }

    #[test]
    fn failed_accelerator_falls_back_to_cpu() {
        let mut tried = Vec::new();
        let (value, device) = with_cpu_fallback(Device::Cuda(0), |dev| {
            tried.push(dev);
            match dev {
                Device::Cuda(_) => Err(HubertError::ModelLoad("no CUDA-capable device".into())),
                Device::Cpu => Ok(7),
            }
        })
        .unwrap();
        assert_eq!((value, device), (7, Device::Cpu));
        assert_eq!(tried, vec![Device::Cuda(0), Device::Cpu]);
    }

    #[test]
    fn working_accelerator_is_kept() {
        let (_, device) = with_cpu_fallback(Device::Cuda(1), |_| Ok(())).unwrap();
        assert_eq!(device, Device::Cuda(1));
    }

    #[test]
    fn cpu_failure_is_not_retried() {
        let mut calls = 0;
        let err = with_cpu_fallback(Device::Cpu, |_| -> Result<(), HubertError> {
            calls += 1;
            Err(HubertError::ModelLoad("bad graph".into()))
        })
        .unwrap_err();
        assert!(matches!(err, HubertError::ModelLoad(_)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn corrupt_checkpoint_on_cuda_is_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hubert_soft.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let err = OnnxLoader::default().load(&path, Device::Cuda(0)).err().unwrap();
        assert!(matches!(err, HubertError::ModelLoad(_)));
    }

    #[test]
    fn cuda_probe_does_not_panic() {
        let _ = OnnxCudaProbe.accelerator_available();
    }
}
