//! Output path planning.
//!
//! Decides where the plaintext archive and the encrypted file are written,
//! depending on encryption and upload settings.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vwbackup_core::reserve_temp_path;

/// Archive file name when no output is given.
pub const DEFAULT_ARCHIVE_FILE: &str = "backup.tar.gz";

/// Encrypted file name when no output is given.
pub const DEFAULT_ENCRYPTED_FILE: &str = "backup.tar.gz.enc";

const ARCHIVE_TEMP_PREFIX: &str = "vwb";

/// What the user asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputRequest<'a> {
    pub output: Option<&'a Path>,
    pub encrypt: bool,
    pub upload: bool,
    pub preserve_archive: bool,
}

/// Where each artifact goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    /// Plaintext archive written by the builder
    pub archive_path: PathBuf,

    /// Encrypted file, if encrypting
    pub encrypted_path: Option<PathBuf>,

    /// Delete the final artifact once it has been uploaded
    pub remove_after_upload: bool,
}

impl OutputPlan {
    /// The file that is kept or uploaded at the end of the run.
    pub fn final_artifact(&self) -> &Path {
        self.encrypted_path.as_deref().unwrap_or(self.archive_path.as_path())
    }
}

/// Plans output locations.
///
/// An encrypted run always builds its plaintext archive at a fresh temporary
/// path. An upload without `preserve_archive` places the final artifact in
/// the system temp directory under the requested (or default) file name.
pub fn plan_outputs(request: &OutputRequest<'_>) -> Result<OutputPlan> {
    plan_outputs_in(request, &std::env::temp_dir())
}

fn plan_outputs_in(request: &OutputRequest<'_>, temp_dir: &Path) -> Result<OutputPlan> {
    let transient = request.upload && !request.preserve_archive;

    if request.encrypt {
        let archive_path = reserve_temp_path(ARCHIVE_TEMP_PREFIX)
            .context("Failed to reserve a temporary archive path")?;
        let requested = request
            .output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENCRYPTED_FILE));

        let encrypted_path = if transient {
            temp_dir.join(file_name_of(&requested, DEFAULT_ENCRYPTED_FILE))
        } else {
            requested
        };

        return Ok(OutputPlan {
            archive_path,
            encrypted_path: Some(encrypted_path),
            remove_after_upload: transient,
        });
    }

    let requested = request
        .output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_FILE));

    let archive_path = if transient {
        temp_dir.join(file_name_of(&requested, DEFAULT_ARCHIVE_FILE))
    } else {
        requested
    };

    Ok(OutputPlan {
        archive_path,
        encrypted_path: None,
        remove_after_upload: transient,
    })
}

fn file_name_of<'a>(path: &'a Path, fallback: &'a str) -> &'a std::ffi::OsStr {
    path.file_name().unwrap_or_else(|| fallback.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp() -> PathBuf {
        PathBuf::from("/scratch")
    }

    #[test]
    fn test_plain_default() {
        let plan = plan_outputs_in(&OutputRequest::default(), &temp()).unwrap();
        assert_eq!(plan.archive_path, PathBuf::from(DEFAULT_ARCHIVE_FILE));
        assert_eq!(plan.encrypted_path, None);
        assert!(!plan.remove_after_upload);
        assert_eq!(plan.final_artifact(), Path::new(DEFAULT_ARCHIVE_FILE));
    }

    #[test]
    fn test_plain_with_output() {
        let request = OutputRequest {
            output: Some(Path::new("/backups/vw.tar.gz")),
            ..Default::default()
        };
        let plan = plan_outputs_in(&request, &temp()).unwrap();
        assert_eq!(plan.archive_path, PathBuf::from("/backups/vw.tar.gz"));
    }

    #[test]
    fn test_encrypted_default() {
        let request = OutputRequest {
            encrypt: true,
            ..Default::default()
        };
        let plan = plan_outputs_in(&request, &temp()).unwrap();

        assert_eq!(plan.encrypted_path, Some(PathBuf::from(DEFAULT_ENCRYPTED_FILE)));
        assert!(plan.archive_path.is_absolute());
        assert!(!plan.archive_path.exists());
        assert!(plan
            .archive_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(ARCHIVE_TEMP_PREFIX));
        assert_eq!(plan.final_artifact(), Path::new(DEFAULT_ENCRYPTED_FILE));
    }

    #[test]
    fn test_upload_without_preserve_goes_to_temp() {
        let request = OutputRequest {
            output: Some(Path::new("/backups/nightly.tar.gz")),
            upload: true,
            ..Default::default()
        };
        let plan = plan_outputs_in(&request, &temp()).unwrap();

        assert_eq!(plan.archive_path, PathBuf::from("/scratch/nightly.tar.gz"));
        assert!(plan.remove_after_upload);
    }

    #[test]
    fn test_encrypted_upload_without_preserve_goes_to_temp() {
        let request = OutputRequest {
            encrypt: true,
            upload: true,
            ..Default::default()
        };
        let plan = plan_outputs_in(&request, &temp()).unwrap();

        assert_eq!(
            plan.encrypted_path,
            Some(PathBuf::from("/scratch/backup.tar.gz.enc"))
        );
        assert!(plan.remove_after_upload);
    }

    #[test]
    fn test_upload_with_preserve_keeps_local_paths() {
        let request = OutputRequest {
            output: Some(Path::new("vw.tar.gz.enc")),
            encrypt: true,
            upload: true,
            preserve_archive: true,
        };
        let plan = plan_outputs_in(&request, &temp()).unwrap();

        assert_eq!(plan.encrypted_path, Some(PathBuf::from("vw.tar.gz.enc")));
        assert!(!plan.remove_after_upload);
    }
}
