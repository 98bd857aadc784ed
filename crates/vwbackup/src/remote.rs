//! Rclone remote lookup.
//!
//! An rclone config file is INI: every `[name]` section defines a remote.
//! A destination such as `b2:vault/backups` is only accepted if its prefix
//! before the first `:` names one of those sections.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A destination validated against an rclone config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Remote name (config section)
    pub remote: String,

    /// Full destination passed to rclone
    pub destination: String,

    /// Config file the remote was found in
    pub config_file: PathBuf,
}

/// Resolves `destination` against the remotes in `config_file`.
pub fn resolve(config_file: Option<&Path>, destination: &str) -> Result<RemoteTarget> {
    let config_file = config_file
        .ok_or_else(|| anyhow!("rclone config file is required when rclone destination is set"))?;

    let content = fs::read_to_string(config_file).with_context(|| {
        format!("Failed to read rclone config file: {}", config_file.display())
    })?;

    let remotes = section_names(&content);
    tracing::debug!(
        "Remotes in {}: {}",
        config_file.display(),
        remotes.join(", ")
    );

    let remote = find_remote(&remotes, destination).ok_or_else(|| {
        anyhow!(
            "no rclone remote setting found for destination '{}'",
            destination
        )
    })?;

    Ok(RemoteTarget {
        remote: remote.to_string(),
        destination: destination.to_string(),
        config_file: config_file.to_path_buf(),
    })
}

/// Section names of an INI document, in file order.
pub fn section_names(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with(';') && !line.starts_with('#'))
        .filter_map(|line| line.strip_prefix('[')?.strip_suffix(']'))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// First remote whose `<name>:` prefixes `destination`.
pub fn find_remote<'a>(remotes: &'a [String], destination: &str) -> Option<&'a str> {
    remotes
        .iter()
        .find(|remote| {
            destination
                .strip_prefix(remote.as_str())
                .is_some_and(|rest| rest.starts_with(':'))
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
; rclone config
[b2]
type = b2
account = 0001
key = secret

# local mirror
[ local-nas ]
type = local

[gdrive]
type = drive
"#;

    #[test]
    fn test_section_names() {
        assert_eq!(section_names(CONFIG), vec!["b2", "local-nas", "gdrive"]);
        assert!(section_names("").is_empty());
        assert!(section_names("type = b2\n[]\n").is_empty());
    }

    #[test]
    fn test_find_remote_requires_colon() {
        let remotes = section_names(CONFIG);
        assert_eq!(find_remote(&remotes, "b2:vault/backups"), Some("b2"));
        assert_eq!(find_remote(&remotes, "local-nas:/mnt/backups"), Some("local-nas"));
        assert_eq!(find_remote(&remotes, "b2vault:backups"), None);
        assert_eq!(find_remote(&remotes, "b2"), None);
        assert_eq!(find_remote(&remotes, "s3:bucket"), None);
    }

    #[test]
    fn test_resolve() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rclone.conf");
        fs::write(&path, CONFIG).unwrap();

        let target = resolve(Some(path.as_path()), "gdrive:Backups/vaultwarden").unwrap();
        assert_eq!(target.remote, "gdrive");
        assert_eq!(target.destination, "gdrive:Backups/vaultwarden");
        assert_eq!(target.config_file, path);
    }

    #[test]
    fn test_resolve_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rclone.conf");
        fs::write(&path, CONFIG).unwrap();

        let err = resolve(None, "b2:x").unwrap_err();
        assert!(err.to_string().contains("config file is required"));

        let err = resolve(Some(path.as_path()), "s3:bucket").unwrap_err();
        assert!(err.to_string().contains("no rclone remote setting found"));

        assert!(resolve(Some(dir.path().join("missing.conf").as_path()), "b2:x").is_err());
    }
}
