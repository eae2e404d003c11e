use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use tracing::debug;

use crate::HubertError;

/// Extension of unit cache files.
pub const CACHE_EXT: &str = "npy";

/// Cache file location for an audio file: same path, `.npy` extension.
pub fn cache_path(wav: &Path) -> PathBuf {
    wav.with_extension(CACHE_EXT)
}

/// Looks up precomputed units for an audio file.
///
/// Lookups are read-only. Populating the cache is up to whoever produced
/// the units (see [`save_units`]).
pub trait UnitCache {
    /// Returns the cached matrix for `wav`, or `None` when nothing is cached.
    fn lookup(&self, wav: &Path) -> Result<Option<Array2<f32>>, HubertError>;
}

/// [`UnitCache`] backed by `.npy` files next to the audio.
///
/// Contents are trusted: a present file is returned without comparing it
/// against the audio it was derived from.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpyCache;

impl UnitCache for NpyCache {
    fn lookup(&self, wav: &Path) -> Result<Option<Array2<f32>>, HubertError> {
        let path = cache_path(wav);
        if !path.is_file() {
            return Ok(None);
        }
        debug!(path = %path.display(), "hubert: loading cached units");
        let units: Array2<f32> = read_npy(&path).map_err(|e| HubertError::CacheRead {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(units))
    }
}

/// Writes a unit matrix as a `.npy` file.
pub fn save_units(path: &Path, units: &Array2<f32>) -> Result<(), HubertError> {
    write_npy(path, units).map_err(|e| HubertError::CacheWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
