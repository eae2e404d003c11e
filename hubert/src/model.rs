use std::path::Path;

use ndarray::{Array3, ArrayView2, ArrayView3};

use crate::device::Device;
use crate::HubertError;

/// Dimensionality of one unit vector.
pub const UNIT_DIM: usize = 256;

/// Sample rate the model consumes.
pub const MODEL_SAMPLE_RATE: u32 = 16_000;

/// A loaded speech-representation model bound to a [`Device`].
///
/// Both entry points take mono float samples at [`MODEL_SAMPLE_RATE`] and
/// return a batched `[B, T, UNIT_DIM]` tensor.
///
/// # Thread Safety
///
/// Implementations must be safe to move across threads. Whether concurrent
/// calls are allowed is up to the implementation.
pub trait UnitModel: Send + Sync {
    /// Soft (continuous) units from a `[1, 1, N]` waveform.
    fn soft_units(&self, wav: ArrayView3<'_, f32>) -> Result<Array3<f32>, HubertError>;

    /// Vector units from a `[1, N]` waveform.
    fn vec_units(&self, wav: ArrayView2<'_, f32>) -> Result<Array3<f32>, HubertError>;

    /// Device the model was placed on.
    fn device(&self) -> Device;
}

/// Loads a [`UnitModel`] from a checkpoint file onto a device.
pub trait ModelLoader {
    fn load(&self, checkpoint: &Path, device: Device) -> Result<Box<dyn UnitModel>, HubertError>;
}
