//! vwbackup core
//!
//! This crate builds portable backups of a Vaultwarden data directory. It
//! resolves a declarative target list into filesystem objects, streams them
//! into a gzip-compressed tar archive with their ownership, permissions and
//! modification times, snapshots the live SQLite database without stopping
//! the server, and optionally encrypts the finished archive.
//!
//! # Features
//!
//! - **Target sets**: `every`, `all`, `recommended`, `default` and single
//!   categories (`db`, `attachments`, `key`, `config`, `sends`, `icon_cache`)
//! - **Streaming archives**: entries are written straight into the output
//!   stream with declared sizes enforced
//! - **Live database snapshots**: `VACUUM INTO` produces a consistent copy
//!   while other processes keep writing
//! - **Encryption**: OpenSSL-compatible AES-256-CBC with PBKDF2-SHA256 keys
//!
//! # Examples
//!
//! ```no_run
//! use vwbackup_core::{encrypt_archive, BackupBuilder, BackupConfig, Passphrase};
//! use std::path::Path;
//!
//! fn main() -> vwbackup_core::Result<()> {
//!     let config = BackupConfig::from_spec("recommended")?.with_archive_base("data/");
//!     let result = BackupBuilder::new(config)
//!         .create(Path::new("/data"), Path::new("/tmp/backup.tar.gz"))?;
//!
//!     println!("Backup created: {} bytes", result.size_bytes);
//!
//!     encrypt_archive(
//!         &result.archive_path,
//!         Path::new("backup.tar.gz.enc"),
//!         &Passphrase::from("correct horse battery staple"),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod builder;
pub mod cleanup;
pub mod encryption;
pub mod error;
pub mod metadata;
pub mod snapshot;
pub mod targets;
pub mod walker;

// Re-export commonly used types
pub use archive::{
    ArchiveBase, ArchiveEntry, ArchiveStats, ArchiveWriter, EntryKind, DEFAULT_ARCHIVE_BASE,
    DEFAULT_COMPRESSION_LEVEL,
};
pub use builder::{build_backup, plan, BackupBuilder, BackupConfig, BackupResult, BackupStep};
pub use cleanup::{reserve_temp_path, RemoveOnExit};
pub use encryption::{
    encrypt_archive, encrypt_bytes, encrypted_path_for, Passphrase, PBKDF2_ITERATIONS,
    SALTED_MAGIC,
};
pub use error::{Error, Result};
pub use metadata::{metadata_of, EntryMetadata};
pub use snapshot::DATABASE_FILE_NAME;
pub use targets::{BackupTargets, DEFAULT_TARGET_SPEC, KNOWN_TOKENS};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
