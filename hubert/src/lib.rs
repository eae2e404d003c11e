//! HuBERT unit extraction for singing voice conversion preprocessing.
//!
//! # Architecture
//!
//! [`FeatureEncoder`] turns an audio waveform into a `[T, 256]` matrix of
//! content units in four steps:
//!
//! 1. [`resolve_checkpoint`]: checkpoint hint -> concrete `*.onnx` file
//! 2. [`select_device`]: `hubert_gpu` preference + [`DeviceProbe`] -> [`Device`]
//! 3. [`UnitCache::lookup`]: `<input>.npy` short-circuits inference when present
//! 4. [`Extractor::extract`]: waveform -> batched units via the soft or vec path
//!
//! # Backends
//!
//! | `use_vec` | [`Backend`] | model input | output |
//! |-----------|-------------|-------------|--------|
//! | `false`   | `Soft`      | `[1, 1, N]` | `[1, T, 256]` |
//! | `true`    | `Vec`       | `[1, N]`    | `[1, T, 256]` |
//!
//! `N` is the number of samples at 16 kHz after decoding, downmixing and
//! resampling (see [`audio`]).
//!
//! # Inference Runtime
//!
//! The `onnx` feature enables [`OnnxLoader`], which runs the exported model
//! with ONNX Runtime and places it on CUDA when available. The `cuda` feature
//! links a runtime build with the CUDA provider; if that provider fails to
//! register, the session is built on CPU. Without `onnx`, a [`ModelLoader`]
//! must be supplied through [`EncoderBuilder::loader`].
//!
//! # Thread Safety
//!
//! A [`FeatureEncoder`] holds no internal locking around `encode`. Sharing one
//! instance across threads is the caller's responsibility.

pub mod audio;
mod cache;
mod checkpoint;
mod config;
mod device;
mod encoder;
mod error;
mod extractor;
mod model;
#[cfg(feature = "onnx")]
mod model_onnx;
pub mod resample;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::{AudioSource, Waveform};
pub use cache::{cache_path, save_units, NpyCache, UnitCache, CACHE_EXT};
pub use checkpoint::{resolve_checkpoint, CHECKPOINT_EXT};
pub use config::{EncoderOptions, HubertConfig, DEFAULT_CHECKPOINT};
pub use device::{select_device, Device, DeviceProbe, NoAccelerator};
pub use encoder::{EncoderBuilder, FeatureEncoder};
pub use error::HubertError;
pub use extractor::{Backend, Extractor, SoftExtractor, VecExtractor};
pub use model::{ModelLoader, UnitModel, MODEL_SAMPLE_RATE, UNIT_DIM};
#[cfg(feature = "onnx")]
pub use model_onnx::{OnnxCudaProbe, OnnxLoader, OnnxModel, OnnxModelConfig};
