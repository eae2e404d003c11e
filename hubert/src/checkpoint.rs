use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::HubertError;

/// File extension of exported model checkpoints.
pub const CHECKPOINT_EXT: &str = "onnx";

/// Resolves a checkpoint hint to a concrete model file.
///
/// The hint's parent directory (`.` when it has none) is searched
/// recursively for `*.onnx` files and the first match wins. Entries are
/// visited in name order, a directory's own files before its
/// subdirectories, so the result is stable across platforms. Symlinked
/// directories are not descended into.
pub fn resolve_checkpoint(hint: &Path) -> Result<PathBuf, HubertError> {
    let dir = match hint.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let not_found = || HubertError::ModelNotFound {
        dir: dir.clone(),
        ext: CHECKPOINT_EXT,
    };

    if !dir.is_dir() {
        return Err(not_found());
    }
    find_first(&dir, CHECKPOINT_EXT)?.ok_or_else(not_found)
}

fn find_first(dir: &Path, ext: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        // Does not follow symlinks.
        if entry.file_type()?.is_dir() {
            subdirs.push(path);
        } else if path.extension() == Some(OsStr::new(ext)) {
            return Ok(Some(path));
        }
    }

    for sub in subdirs {
        if let Some(found) = find_first(&sub, ext)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
