use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{ConvertError, Result};

/// Substring that marks a directory entry as a measurement pickle.
pub const PICKLE_MARKER: &str = ".pickle";

/// Whether a file name qualifies as a measurement file.
///
/// This is a plain substring test: `run.pickle.bak` qualifies,
/// `notrealpickle.txt` does not.
pub fn is_candidate(file_name: &str) -> bool {
    has_marker(file_name.as_bytes())
}

/// Byte-level marker test, so names that are not valid UTF-8 still qualify.
fn has_marker(name: &[u8]) -> bool {
    let marker = PICKLE_MARKER.as_bytes();
    name.windows(marker.len()).any(|w| w == marker)
}

/// List the measurement files directly inside `dir`.
///
/// Only regular files are kept (symlinks are followed). The result is sorted
/// by file name so repeated runs see the same order.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| ConvertError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();

        if !has_marker(entry.file_name().as_encoded_bytes()) {
            continue;
        }
        // `fs::metadata` follows symlinks; a dangling link is not a file.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => files.push(path),
            _ => debug!("skipping non-file entry {}", path.display()),
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
