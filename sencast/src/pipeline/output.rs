//! Output verification shared by the processor, mosaic and adapter stages.

use std::path::Path;
use tracing::{debug, warn};

use super::error::CellFailure;

/// Checks that a step left a usable output at `path`.
///
/// A file must reach `min_bytes`; a directory must not be empty. Undersized
/// files are removed so the next run retries the step instead of skipping it.
pub fn verify_output(path: &Path, min_bytes: u64) -> Result<(), CellFailure> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return Err(CellFailure::NoOutput(path.to_path_buf())),
    };

    if metadata.is_dir() {
        let empty = std::fs::read_dir(path)?.next().is_none();
        if empty {
            return Err(CellFailure::Undersized {
                path: path.to_path_buf(),
                size: 0,
                min: min_bytes,
            });
        }
        return Ok(());
    }

    let size = metadata.len();
    if size < min_bytes {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove undersized output");
        }
        return Err(CellFailure::Undersized {
            path: path.to_path_buf(),
            size,
            min: min_bytes,
        });
    }
    Ok(())
}

/// Whether a previous run already produced a usable output at `path`.
///
/// An existing but undersized output is removed and does not count.
pub fn reusable_output(path: &Path, min_bytes: u64) -> bool {
    if !path.exists() {
        return false;
    }
    match verify_output(path, min_bytes) {
        Ok(()) => true,
        Err(e) => {
            debug!(path = %path.display(), reason = %e, "Existing output is not reusable");
            false
        }
    }
}
