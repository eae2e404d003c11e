//! Test doubles shared across unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::audio::Waveform;
use crate::cache::UnitCache;
use crate::device::{Device, DeviceProbe};
use crate::extractor::Extractor;
use crate::model::{ModelLoader, UnitModel, UNIT_DIM};
use crate::HubertError;

/// HuBERT frame hop at 16 kHz.
pub const HOP: usize = 320;

/// Call counters shared between a double and the test that owns it.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    soft: Arc<AtomicUsize>,
    vec: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
    last_samples: Arc<AtomicUsize>,
}

impl Counters {
    pub fn soft(&self) -> usize {
        self.soft.load(Ordering::SeqCst)
    }

    pub fn vec(&self) -> usize {
        self.vec.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn last_samples(&self) -> usize {
        self.last_samples.load(Ordering::SeqCst)
    }
}

/// Model returning `[1, N / HOP, UNIT_DIM]` where every value is the frame index.
pub struct FakeModel {
    device: Device,
    dim: usize,
    counters: Counters,
}

impl FakeModel {
    pub fn new(device: Device) -> Self {
        Self::with_counters(device, Counters::default())
    }

    pub fn with_counters(device: Device, counters: Counters) -> Self {
        Self {
            device,
            dim: UNIT_DIM,
            counters,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    fn units(&self, samples: usize) -> Array3<f32> {
        self.counters.last_samples.store(samples, Ordering::SeqCst);
        Array3::from_shape_fn((1, samples / HOP, self.dim), |(_, t, _)| t as f32)
    }
}

impl UnitModel for FakeModel {
    fn soft_units(&self, wav: ArrayView3<'_, f32>) -> Result<Array3<f32>, HubertError> {
        self.counters.soft.fetch_add(1, Ordering::SeqCst);
        Ok(self.units(wav.shape()[2]))
    }

    fn vec_units(&self, wav: ArrayView2<'_, f32>) -> Result<Array3<f32>, HubertError> {
        self.counters.vec.fetch_add(1, Ordering::SeqCst);
        Ok(self.units(wav.shape()[1]))
    }

    fn device(&self) -> Device {
        self.device
    }
}

/// Loader producing [`FakeModel`]s that share one set of counters.
#[derive(Clone, Default)]
pub struct FakeLoader {
    pub counters: Counters,
    pub fail: bool,
    pub dim: Option<usize>,
    /// Ignore the requested device and load on CPU.
    pub cpu_only: bool,
    loaded: Arc<Mutex<Vec<(PathBuf, Device)>>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Loader whose models emit `dim`-wide units.
    pub fn with_dim(dim: usize) -> Self {
        Self {
            dim: Some(dim),
            ..Self::default()
        }
    }

    /// Loader that always lands on CPU, like a CUDA runtime on a GPU-less host.
    pub fn cpu_only() -> Self {
        Self {
            cpu_only: true,
            ..Self::default()
        }
    }

    /// Checkpoints and devices passed to `load`, in call order.
    pub fn loaded(&self) -> Vec<(PathBuf, Device)> {
        self.loaded.lock().unwrap().clone()
    }
}

impl ModelLoader for FakeLoader {
    fn load(&self, checkpoint: &Path, device: Device) -> Result<Box<dyn UnitModel>, HubertError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded
            .lock()
            .unwrap()
            .push((checkpoint.to_path_buf(), device));
        if self.fail {
            return Err(HubertError::ModelLoad("corrupt checkpoint".into()));
        }
        let device = if self.cpu_only { Device::Cpu } else { device };
        let mut model = FakeModel::with_counters(device, self.counters.clone());
        if let Some(dim) = self.dim {
            model.dim = dim;
        }
        Ok(Box::new(model))
    }
}

/// Probe with a fixed answer that counts how often it was asked.
#[derive(Debug, Default)]
pub struct FixedProbe {
    available: bool,
    calls: AtomicUsize,
}

impl FixedProbe {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeviceProbe for FixedProbe {
    fn accelerator_available(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.available
    }
}

/// In-memory cache keyed by audio path.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<PathBuf, Array2<f32>>>>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryCache {
    pub fn insert(&self, wav: &Path, units: Array2<f32>) {
        self.entries.lock().unwrap().insert(wav.to_path_buf(), units);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl UnitCache for MemoryCache {
    fn lookup(&self, wav: &Path) -> Result<Option<Array2<f32>>, HubertError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().get(wav).cloned())
    }
}

/// Extractor that records the stream position it was handed.
#[derive(Clone, Default)]
pub struct PositionRecorder {
    positions: Arc<Mutex<Vec<Option<u64>>>>,
}

impl PositionRecorder {
    /// One entry per call: `Some(pos)` for streams, `None` for paths.
    pub fn positions(&self) -> Vec<Option<u64>> {
        self.positions.lock().unwrap().clone()
    }
}

impl Extractor for PositionRecorder {
    fn extract(
        &self,
        _model: &dyn UnitModel,
        wav: &mut Waveform<'_>,
        _device: Device,
    ) -> Result<Array3<f32>, HubertError> {
        let pos = match wav {
            Waveform::Stream(stream) => Some(stream.stream_position()?),
            Waveform::Path(_) => None,
        };
        self.positions.lock().unwrap().push(pos);
        Ok(Array3::zeros((1, 3, UNIT_DIM)))
    }
}

/// Encodes 16-bit PCM samples as an in-memory WAV file.
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf.rewind().unwrap();
    buf.into_inner()
}

/// Writes a mono 16-bit WAV file.
pub fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
    std::fs::write(path, wav_bytes(sample_rate, 1, samples)).unwrap();
}
