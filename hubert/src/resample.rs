//! Rubato-based sample rate conversion for whole mono buffers.

use rubato::{FftFixedInOut, Resampler};

use crate::HubertError;

/// Frames per processing block.
const CHUNK_SIZE: usize = 1024;

impl From<rubato::ResamplerConstructionError> for HubertError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        HubertError::Audio(format!("resampler: {e}"))
    }
}

impl From<rubato::ResampleError> for HubertError {
    fn from(e: rubato::ResampleError) -> Self {
        HubertError::Audio(format!("resampler: {e}"))
    }
}

/// Number of output frames for `len` input frames.
pub fn output_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((len as u64 * to_rate as u64 + from_rate as u64 / 2) / from_rate as u64) as usize
}

/// Resamples mono float samples from `from_rate` to `to_rate`.
///
/// The filter delay is trimmed, so the output is aligned with the input
/// and holds [`output_len`] samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, HubertError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(HubertError::Audio("sample rate must be positive".into()));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1)?;
    let delay = resampler.output_delay();
    let expected = output_len(samples.len(), from_rate, to_rate);

    let mut out = Vec::with_capacity(expected + delay + resampler.output_frames_max());
    let mut input = vec![Vec::with_capacity(resampler.input_frames_max())];
    let mut pos = 0;

    // Feed zero-padded blocks until the delayed tail has been flushed.
    while out.len() < expected + delay {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(samples.len());

        input[0].clear();
        input[0].extend_from_slice(&samples[pos..end]);
        input[0].resize(needed, 0.0);
        pos = end;

        let block = resampler.process(&input, None)?;
        out.extend_from_slice(&block[0]);
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}
