//! Waveform inputs and decoding to model-rate mono samples.
//!
//! WAV files are decoded with `hound`. Integer PCM of any width is scaled
//! to `[-1, 1]`, float PCM is taken as-is. Multi-channel audio is averaged
//! down to mono. Sources below [`MODEL_SAMPLE_RATE`] are rejected rather than
//! upsampled; anything above is resampled down.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::model::MODEL_SAMPLE_RATE;
use crate::resample::resample;
use crate::HubertError;

/// A seekable byte stream holding an encoded audio file.
pub trait AudioSource: Read + Seek {}

impl<T: Read + Seek> AudioSource for T {}

/// Audio handed to the encoder: a file on disk or an in-memory stream.
pub enum Waveform<'a> {
    Path(&'a Path),
    Stream(&'a mut dyn AudioSource),
}

impl<'a> Waveform<'a> {
    /// Filesystem path, if any. Streams have no cache key.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            Self::Stream(_) => None,
        }
    }
}

impl std::fmt::Debug for Waveform<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<hound::Error> for HubertError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => HubertError::Io(io),
            other => HubertError::Audio(other.to_string()),
        }
    }
}

/// Decodes a WAV stream to mono float samples. Returns `(samples, sample_rate)`.
pub fn decode_wav<R: Read>(reader: R) -> Result<(Vec<f32>, u32), HubertError> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(HubertError::Audio("wav has no channels".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok((downmix(&interleaved, spec.channels as usize), spec.sample_rate))
}

/// Averages interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Brings decoded samples to [`MODEL_SAMPLE_RATE`].
pub fn to_model_rate(samples: Vec<f32>, sample_rate: u32) -> Result<Vec<f32>, HubertError> {
    if sample_rate < MODEL_SAMPLE_RATE {
        return Err(HubertError::SampleRateTooLow {
            got: sample_rate,
            min: MODEL_SAMPLE_RATE,
        });
    }
    if sample_rate == MODEL_SAMPLE_RATE {
        return Ok(samples);
    }
    resample(&samples, sample_rate, MODEL_SAMPLE_RATE)
}

/// Decodes a waveform input into mono samples at [`MODEL_SAMPLE_RATE`].
///
/// Streams are read from their current position.
pub fn load_waveform(wav: &mut Waveform<'_>) -> Result<Vec<f32>, HubertError> {
    let (samples, rate) = match wav {
        Waveform::Path(path) => decode_wav(BufReader::new(File::open(path)?))?,
        Waveform::Stream(stream) => decode_wav(&mut **stream)?,
    };
    to_model_rate(samples, rate)
}
