//! Upload of finished backups with the rclone CLI.

use crate::remote::RemoteTarget;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs `rclone copy` against a validated remote.
#[derive(Debug, Clone)]
pub struct Uploader {
    binary: PathBuf,
    config_file: PathBuf,
}

impl Uploader {
    /// Locates `rclone` on the PATH.
    ///
    /// `artifact` is only used to tell the user what was left on disk.
    pub fn locate(target: &RemoteTarget, artifact: &Path) -> Result<Self> {
        let binary = which::which("rclone").map_err(|_| {
            anyhow!(
                "Uploading requires the 'rclone' CLI tool.\n\
                 Install it from https://rclone.org/install/\n\n\
                 The backup has been saved to: {}",
                artifact.display()
            )
        })?;

        Ok(Self::with_binary(binary, target))
    }

    fn with_binary(binary: PathBuf, target: &RemoteTarget) -> Self {
        Self {
            binary,
            config_file: target.config_file.clone(),
        }
    }

    fn command(&self, local: &Path, destination: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("copy")
            .arg("--config")
            .arg(&self.config_file)
            .arg(local)
            .arg(destination);
        cmd
    }

    /// Copies `local` into `destination`.
    pub fn copy(&self, local: &Path, destination: &str) -> Result<()> {
        tracing::debug!(
            "Running {} copy --config {} {} {}",
            self.binary.display(),
            self.config_file.display(),
            local.display(),
            destination
        );

        let status = self
            .command(local, destination)
            .status()
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        if !status.success() {
            return Err(anyhow!(
                "rclone copy failed with exit code: {}",
                status.code().unwrap_or(-1)
            ));
        }

        Ok(())
    }
}
