//! Encoder configuration.
//!
//! [`HubertConfig`] is read from the same YAML hparams file the rest of the
//! diff-svc pipeline uses; keys this crate does not know are ignored.
//! Construction resolves it into an immutable [`EncoderOptions`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::extractor::Backend;
use crate::HubertError;

/// Default checkpoint hint.
pub const DEFAULT_CHECKPOINT: &str = "checkpoints/hubert/hubert_soft.onnx";

/// Encoder settings as supplied by the caller. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubertConfig {
    /// Use the vector-unit path instead of soft units (default: false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_vec: Option<bool>,

    /// Prefer a GPU when one is available (default: true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hubert_gpu: Option<bool>,

    /// Checkpoint hint (default: [`DEFAULT_CHECKPOINT`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hubert_path: Option<PathBuf>,
}

impl HubertConfig {
    /// Parses a YAML hparams document.
    pub fn from_yaml_str(content: &str) -> Result<Self, HubertError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| HubertError::Config(e.to_string()))
    }

    /// Reads and parses a YAML hparams file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HubertError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn use_vec(&self) -> bool {
        self.use_vec.unwrap_or(false)
    }

    pub fn hubert_gpu(&self) -> bool {
        self.hubert_gpu.unwrap_or(true)
    }

    pub fn checkpoint_hint(&self) -> PathBuf {
        self.hubert_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT))
    }
}

/// Fully resolved settings of a constructed encoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncoderOptions {
    pub use_vec: bool,
    pub hubert_gpu: bool,
    pub backend: Backend,
    pub device: Device,
    /// Checkpoint file the model was loaded from.
    pub checkpoint: PathBuf,
}

impl EncoderOptions {
    /// Returns a configuration with every key filled in.
    pub fn to_config(&self) -> HubertConfig {
        HubertConfig {
            use_vec: Some(self.use_vec),
            hubert_gpu: Some(self.hubert_gpu),
            hubert_path: Some(self.checkpoint.clone()),
        }
    }
}
