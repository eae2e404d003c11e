use std::io::Read;
use std::io::Seek;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, Axis};
use tracing::{debug, info};

use crate::audio::{AudioSource, Waveform};
use crate::cache::{NpyCache, UnitCache};
use crate::checkpoint::resolve_checkpoint;
use crate::config::{EncoderOptions, HubertConfig};
use crate::device::{select_device, DeviceProbe};
use crate::extractor::{Backend, Extractor};
use crate::model::{ModelLoader, UnitModel, UNIT_DIM};
use crate::HubertError;

/// Extracts `[T, 256]` unit matrices from audio with a model loaded once.
///
/// # Pipeline
///
/// 1. Stream input: rewind to the start, skip the cache
/// 2. Path input: return the cached matrix if [`UnitCache`] has one
/// 3. Otherwise run the [`Extractor`] for the configured [`Backend`]
///    and take batch element 0
///
/// Failures from any step are returned unchanged; nothing is retried.
pub struct FeatureEncoder {
    model: Box<dyn UnitModel>,
    extractor: Box<dyn Extractor>,
    cache: Box<dyn UnitCache + Send + Sync>,
    options: EncoderOptions,
}

impl std::fmt::Debug for FeatureEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureEncoder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FeatureEncoder {
    /// Creates an encoder backed by ONNX Runtime and `.npy` caches.
    ///
    /// `hint` names a checkpoint file or a sibling of one; see
    /// [`resolve_checkpoint`].
    #[cfg(feature = "onnx")]
    pub fn new(hint: impl AsRef<Path>, config: &HubertConfig) -> Result<Self, HubertError> {
        EncoderBuilder::new(config).checkpoint(hint).build()
    }

    /// Returns a builder for encoders with custom collaborators.
    pub fn builder(config: &HubertConfig) -> EncoderBuilder {
        EncoderBuilder::new(config)
    }

    /// Resolved settings this encoder was built with.
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn model(&self) -> &dyn UnitModel {
        self.model.as_ref()
    }

    /// Extracts units for one waveform.
    pub fn encode(&self, mut wav: Waveform<'_>) -> Result<Array2<f32>, HubertError> {
        if let Some(path) = wav.path() {
            if let Some(units) = self.cache.lookup(path)? {
                debug!(path = %path.display(), frames = units.nrows(), "hubert: cache hit");
                check_dim(&units)?;
                return Ok(units);
            }
        } else if let Waveform::Stream(stream) = &mut wav {
            stream.rewind()?;
        }

        let batch = self
            .extractor
            .extract(self.model.as_ref(), &mut wav, self.options.device)?;
        let units = first_in_batch(batch)?;
        check_dim(&units)?;
        Ok(units)
    }

    /// Extracts units for an audio file, consulting the cache first.
    pub fn encode_path(&self, path: impl AsRef<Path>) -> Result<Array2<f32>, HubertError> {
        self.encode(Waveform::Path(path.as_ref()))
    }

    /// Extracts units from an in-memory audio file. The cache is not used.
    pub fn encode_stream<R: Read + Seek>(&self, stream: &mut R) -> Result<Array2<f32>, HubertError> {
        let source: &mut dyn AudioSource = stream;
        self.encode(Waveform::Stream(source))
    }
}

fn first_in_batch(batch: Array3<f32>) -> Result<Array2<f32>, HubertError> {
    if batch.len_of(Axis(0)) == 0 {
        return Err(HubertError::Inference("model returned an empty batch".into()));
    }
    Ok(batch.index_axis_move(Axis(0), 0))
}

fn check_dim(units: &Array2<f32>) -> Result<(), HubertError> {
    if units.ncols() != UNIT_DIM {
        return Err(HubertError::DimensionMismatch {
            expected: UNIT_DIM,
            got: units.ncols(),
        });
    }
    Ok(())
}

/// Assembles a [`FeatureEncoder`] from a configuration and collaborators.
///
/// Collaborators left unset fall back to the defaults: `.npy` caches,
/// and with the `onnx` feature, the ONNX Runtime loader and CUDA probe.
pub struct EncoderBuilder {
    config: HubertConfig,
    hint: Option<PathBuf>,
    loader: Option<Box<dyn ModelLoader>>,
    probe: Option<Box<dyn DeviceProbe>>,
    cache: Option<Box<dyn UnitCache + Send + Sync>>,
    extractor: Option<Box<dyn Extractor>>,
}

impl EncoderBuilder {
    pub fn new(config: &HubertConfig) -> Self {
        Self {
            config: config.clone(),
            hint: None,
            loader: None,
            probe: None,
            cache: None,
            extractor: None,
        }
    }

    /// Overrides the configuration's `hubert_path`.
    pub fn checkpoint(mut self, hint: impl AsRef<Path>) -> Self {
        self.hint = Some(hint.as_ref().to_path_buf());
        self
    }

    pub fn loader(mut self, loader: impl ModelLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn probe(mut self, probe: impl DeviceProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn cache(mut self, cache: impl UnitCache + Send + Sync + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Replaces the extractor chosen from `use_vec`.
    pub fn extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Resolves the checkpoint, selects the device, and loads the model.
    pub fn build(self) -> Result<FeatureEncoder, HubertError> {
        let hint = self.hint.unwrap_or_else(|| self.config.checkpoint_hint());
        let checkpoint = resolve_checkpoint(&hint)?;

        let hubert_gpu = self.config.hubert_gpu();
        let probe = match self.probe {
            Some(p) => p,
            None => default_probe(),
        };
        let device = select_device(hubert_gpu, probe.as_ref());

        let loader = match self.loader {
            Some(l) => l,
            None => default_loader()?,
        };
        info!(checkpoint = %checkpoint.display(), %device, "hubert: loading model");
        let model = loader.load(&checkpoint, device)?;
        // The loader may have dropped to CPU if the accelerator was unusable.
        let device = model.device();

        let use_vec = self.config.use_vec();
        let backend = Backend::from_use_vec(use_vec);
        let extractor = self.extractor.unwrap_or_else(|| backend.extractor());
        let cache: Box<dyn UnitCache + Send + Sync> = match self.cache {
            Some(c) => c,
            None => Box::new(NpyCache),
        };

        Ok(FeatureEncoder {
            model,
            extractor,
            cache,
            options: EncoderOptions {
                use_vec,
                hubert_gpu,
                backend,
                device,
                checkpoint,
            },
        })
    }
}

#[cfg(feature = "onnx")]
fn default_probe() -> Box<dyn DeviceProbe> {
    Box::new(crate::model_onnx::OnnxCudaProbe)
}

#[cfg(not(feature = "onnx"))]
fn default_probe() -> Box<dyn DeviceProbe> {
    Box::new(crate::device::NoAccelerator)
}

#[cfg(feature = "onnx")]
fn default_loader() -> Result<Box<dyn ModelLoader>, HubertError> {
    Ok(Box::new(crate::model_onnx::OnnxLoader::default()))
}

#[cfg(not(feature = "onnx"))]
fn default_loader() -> Result<Box<dyn ModelLoader>, HubertError> {
    Err(HubertError::Config(
        "no model loader configured; enable the `onnx` feature or call EncoderBuilder::loader".into(),
    ))
}
