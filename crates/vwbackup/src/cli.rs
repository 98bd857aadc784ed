//! CLI argument parsing with clap

use clap::Parser;
use std::path::PathBuf;
use vwbackup_core::{DEFAULT_ARCHIVE_BASE, DEFAULT_COMPRESSION_LEVEL, DEFAULT_TARGET_SPEC};

/// vwbackup - Back up a Vaultwarden data directory
///
/// Targets: every, all, recommended, default, db, attachments, key, config,
/// sends, icon_cache (comma-separated).
#[derive(Parser, Debug)]
#[command(name = "vwbackup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Vaultwarden data directory
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Output file (default: backup.tar.gz, or backup.tar.gz.enc with --encrypt)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Backup targets
    #[arg(short, long, default_value = DEFAULT_TARGET_SPEC, env = "BACKUP_TARGETS")]
    pub targets: String,

    /// Encrypt the backup (passphrase from BACKUP_PASSPHRASE or prompt)
    #[arg(short, long)]
    pub encrypt: bool,

    /// Base directory inside the archive
    #[arg(short = 'b', long, default_value = DEFAULT_ARCHIVE_BASE)]
    pub archive_base_dir: String,

    /// Rclone destination (remote:path) to upload the backup to
    #[arg(short, long)]
    pub rclone_destination: Option<String>,

    /// Rclone config file
    #[arg(short = 'c', long, env = "RCLONE_CONFIG")]
    pub rclone_config_file: Option<PathBuf>,

    /// Keep the local file after uploading
    #[arg(short = 'k', long)]
    pub preserve_archive: bool,

    /// Compression level (1-9)
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL, value_parser = clap::value_parser!(u32).range(1..=9))]
    pub compression: u32,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Log filter directive (overrides -v/-q), e.g. "debug" or "vwbackup_core=trace"
    #[arg(short = 'l', long, visible_alias = "loglevel")]
    pub log_level: Option<String>,
}
