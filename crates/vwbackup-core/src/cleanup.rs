//! Scoped removal of temporary files.
//!
//! A [`RemoveOnExit`] guard owns a path and removes it exactly once: either
//! explicitly through [`RemoveOnExit::finish`], which merges the removal
//! outcome with the result of the guarded work, or on drop if the guarded
//! code unwinds before reaching `finish`.

use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};

/// Removes a file when the guarded operation ends.
#[derive(Debug)]
pub struct RemoveOnExit {
    path: PathBuf,
    armed: bool,
}

impl RemoveOnExit {
    /// Guards `path`. The file does not have to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// Removes the file and folds the outcome into `primary`.
    ///
    /// A failed `primary` is returned untouched even when removal also
    /// fails. A removal failure is only surfaced when `primary` succeeded.
    /// A file that is already gone counts as removed.
    pub fn finish<T>(mut self, primary: Result<T>) -> Result<T> {
        self.armed = false;
        let removal = remove_if_exists(&self.path);

        match (primary, removal) {
            (Err(e), Err(cleanup)) => {
                tracing::warn!(
                    "Failed to remove {} after error: {}",
                    self.path.display(),
                    cleanup
                );
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(_), Err(cleanup)) => Err(Error::cleanup(&self.path, cleanup)),
            (Ok(value), Ok(())) => {
                tracing::debug!("Removed {}", self.path.display());
                Ok(value)
            }
        }
    }
}

impl Drop for RemoveOnExit {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = remove_if_exists(&self.path) {
                tracing::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Reserves a unique, currently non-existent path in the system temp
/// directory.
///
/// The file is created to claim the name and then deleted again, so no
/// descriptor stays open and the caller (or another engine) can create it.
pub fn reserve_temp_path(prefix: &str) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix(prefix)
        .tempfile()
        .map_err(|e| Error::io(std::env::temp_dir(), e))?;

    let path = file.path().to_path_buf();
    file.close().map_err(|e| Error::io(&path, e))?;

    Ok(path)
}
