use ndarray::{Array2, Array3};
use serde::Serialize;
use tracing::debug;

use crate::audio::{load_waveform, Waveform};
use crate::device::Device;
use crate::model::UnitModel;
use crate::HubertError;

/// Feature extraction path, selected by `use_vec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Continuous HuBERT-soft units.
    Soft,
    /// Vector units from the projected intermediate layer.
    Vec,
}

impl Backend {
    pub fn from_use_vec(use_vec: bool) -> Self {
        if use_vec { Self::Vec } else { Self::Soft }
    }

    /// Returns the extractor implementing this path.
    pub fn extractor(self) -> Box<dyn Extractor> {
        match self {
            Self::Soft => Box::new(SoftExtractor),
            Self::Vec => Box::new(VecExtractor),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Vec => write!(f, "vec"),
        }
    }
}

/// Turns a waveform into batched units using a loaded model.
///
/// The result has shape `[B, T, UNIT_DIM]`; callers use batch element 0.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        model: &dyn UnitModel,
        wav: &mut Waveform<'_>,
        device: Device,
    ) -> Result<Array3<f32>, HubertError>;
}

/// Soft units: the model sees the waveform as `[1, 1, N]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftExtractor;

impl Extractor for SoftExtractor {
    fn extract(
        &self,
        model: &dyn UnitModel,
        wav: &mut Waveform<'_>,
        device: Device,
    ) -> Result<Array3<f32>, HubertError> {
        let samples = load_waveform(wav)?;
        debug!(samples = samples.len(), %device, "hubert: soft units");
        let n = samples.len();
        let input = Array3::from_shape_vec((1, 1, n), samples)
            .map_err(|e| HubertError::Inference(e.to_string()))?;
        model.soft_units(input.view())
    }
}

/// Vector units: the model sees the waveform as `[1, N]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VecExtractor;

impl Extractor for VecExtractor {
    fn extract(
        &self,
        model: &dyn UnitModel,
        wav: &mut Waveform<'_>,
        device: Device,
    ) -> Result<Array3<f32>, HubertError> {
        let samples = load_waveform(wav)?;
        debug!(samples = samples.len(), %device, "hubert: vec units");
        let n = samples.len();
        let input = Array2::from_shape_vec((1, n), samples)
            .map_err(|e| HubertError::Inference(e.to_string()))?;
        model.vec_units(input.view())
    }
}
