//! Passphrase acquisition for encrypted backups.

use anyhow::{anyhow, Context, Result};
use dialoguer::Password;
use std::io::IsTerminal;
use vwbackup_core::Passphrase;

/// Environment variable holding the passphrase.
pub const PASSPHRASE_ENV: &str = "BACKUP_PASSPHRASE";

/// Reads the passphrase from `BACKUP_PASSPHRASE`, or prompts for it when
/// stdin is a terminal. Without either source the passphrase is empty.
pub fn read_passphrase() -> Result<Passphrase> {
    let from_env = match std::env::var(PASSPHRASE_ENV) {
        Ok(value) => Some(value),
        Err(std::env::VarError::NotPresent) => None,
        Err(std::env::VarError::NotUnicode(_)) => {
            return Err(anyhow!("{} is not valid UTF-8", PASSPHRASE_ENV));
        }
    };

    resolve(from_env, std::io::stdin().is_terminal(), prompt)
}

fn prompt() -> Result<String> {
    Password::new()
        .with_prompt("Enter passphrase for a new backup file")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read passphrase")
}

fn resolve(
    from_env: Option<String>,
    interactive: bool,
    prompt: impl FnOnce() -> Result<String>,
) -> Result<Passphrase> {
    if let Some(value) = from_env {
        tracing::debug!("Using passphrase from {}", PASSPHRASE_ENV);
        return Ok(Passphrase::new(value));
    }

    if interactive {
        return prompt().map(Passphrase::new);
    }

    tracing::warn!(
        "{} is not set and stdin is not a terminal; encrypting with an empty passphrase",
        PASSPHRASE_ENV
    );
    Ok(Passphrase::default())
}
