//! Ownership and permission extraction for archive headers.
//!
//! On Unix the owner, group and permission bits come straight from the
//! inode. Elsewhere there is no ownership concept, so entries get zero ids
//! and a conventional mode of `0644` for files and `0755` for directories.

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// Default mode for regular files when the platform reports none.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default mode for directories when the platform reports none.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Portable subset of filesystem metadata written into archive headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub uid: u64,
    pub gid: u64,
    /// Permission bits (`0o7777` mask), without the file type.
    pub mode: u32,
}

impl EntryMetadata {
    #[cfg_attr(unix, allow(dead_code))]
    fn defaults_for(metadata: &Metadata) -> Self {
        Self {
            uid: 0,
            gid: 0,
            mode: if metadata.is_dir() {
                DEFAULT_DIR_MODE
            } else {
                DEFAULT_FILE_MODE
            },
        }
    }
}

/// Extracts owner, group and mode from filesystem metadata.
#[cfg(unix)]
pub fn metadata_of(metadata: &Metadata) -> EntryMetadata {
    use std::os::unix::fs::MetadataExt;

    EntryMetadata {
        uid: u64::from(metadata.uid()),
        gid: u64::from(metadata.gid()),
        mode: metadata.mode() & 0o7777,
    }
}

/// Extracts owner, group and mode from filesystem metadata.
#[cfg(not(unix))]
pub fn metadata_of(metadata: &Metadata) -> EntryMetadata {
    EntryMetadata::defaults_for(metadata)
}

/// Modification time in seconds since the Unix epoch (0 if unavailable or
/// before the epoch).
pub fn mtime_of(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
