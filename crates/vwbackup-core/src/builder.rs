//! Backup orchestration.
//!
//! Resolved targets are turned into an ordered list of [`BackupStep`]s which
//! are executed one after another against a single archive stream. The
//! first failing step aborts the run; entries already written stay in the
//! (partial) output file.

use crate::archive::{ArchiveBase, ArchiveEntry, ArchiveWriter, DEFAULT_COMPRESSION_LEVEL};
use crate::error::{Error, IoResultExt, Result};
use crate::metadata::{metadata_of, mtime_of};
use crate::snapshot::append_database_snapshot;
use crate::targets::BackupTargets;
use crate::walker::{append_with_metadata, walk_tree, WalkOptions};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Directory holding per-cipher attachment files.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Directory holding file sends.
pub const SENDS_DIR: &str = "sends";

/// Directory holding cached website icons.
pub const ICON_CACHE_DIR: &str = "icon_cache";

/// Server configuration written by the admin panel.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Glob matching the JWT signing key pair.
pub const KEY_FILE_PATTERN: &str = "rsa_key.*";

/// One unit of work in a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStep {
    /// Walk the whole source tree, leaving out the live database.
    Tree,
    /// Directory entry for the archive base itself.
    Root,
    /// A subtree of the source directory.
    Directory(&'static str),
    /// Every direct match of a glob in the source directory.
    FilePattern(&'static str),
    /// A single optional file.
    File(&'static str),
    /// A consistent snapshot of the live database.
    Database,
}

impl fmt::Display for BackupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree => write!(f, "entire data directory"),
            Self::Root => write!(f, "archive root"),
            Self::Directory(name) => write!(f, "{}", name),
            Self::FilePattern(pattern) => write!(f, "{}", pattern),
            Self::File(name) => write!(f, "{}", name),
            Self::Database => write!(f, "database"),
        }
    }
}

/// Ordered steps for a target set.
///
/// Whole-tree mode yields the tree walk followed by the database snapshot
/// and nothing else. Otherwise the root entry comes first and each selected
/// category follows in a fixed order, with the database last.
pub fn plan(targets: &BackupTargets) -> Vec<BackupStep> {
    if targets.every {
        return vec![BackupStep::Tree, BackupStep::Database];
    }

    let mut steps = vec![BackupStep::Root];
    if targets.attachments {
        steps.push(BackupStep::Directory(ATTACHMENTS_DIR));
    }
    if targets.key_files {
        steps.push(BackupStep::FilePattern(KEY_FILE_PATTERN));
    }
    if targets.config {
        steps.push(BackupStep::File(CONFIG_FILE_NAME));
    }
    if targets.sends {
        steps.push(BackupStep::Directory(SENDS_DIR));
    }
    if targets.icon_cache {
        steps.push(BackupStep::Directory(ICON_CACHE_DIR));
    }
    if targets.database {
        steps.push(BackupStep::Database);
    }
    steps
}

/// Configuration for a backup run.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Categories to include
    pub targets: BackupTargets,

    /// Prefix for every entry path
    pub archive_base: ArchiveBase,

    /// Gzip level (1-9)
    pub compression_level: u32,
}

impl BackupConfig {
    /// Creates a configuration with the default archive base and compression.
    pub fn new(targets: BackupTargets) -> Self {
        Self {
            targets,
            archive_base: ArchiveBase::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Parses a target specification into a configuration.
    pub fn from_spec(spec: &str) -> Result<Self> {
        Ok(Self::new(BackupTargets::parse(spec)?))
    }

    /// Sets the archive base prefix.
    pub fn with_archive_base(mut self, base: impl Into<String>) -> Self {
        self.archive_base = ArchiveBase::new(base);
        self
    }

    /// Sets the compression level.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.clamp(1, 9);
        self
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::new(BackupTargets::default_set())
    }
}

/// Result of a backup operation.
#[derive(Debug, Clone)]
pub struct BackupResult {
    /// Path to the created archive
    pub archive_path: PathBuf,

    /// Size of the archive in bytes
    pub size_bytes: u64,

    /// Number of entries written
    pub entry_count: usize,

    /// Sum of all file payload sizes
    pub payload_bytes: u64,

    /// Targets that were backed up
    pub targets: BackupTargets,

    /// Duration of the operation in seconds
    pub duration_seconds: f64,
}

/// Archive builder for creating backups.
pub struct BackupBuilder {
    config: BackupConfig,
}

impl BackupBuilder {
    /// Creates a new backup builder.
    pub fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    /// Creates a backup archive of `source_dir` at `output_path`.
    ///
    /// The output file is created (or truncated) before any entry is
    /// written and is left in place if a step fails.
    pub fn create(&self, source_dir: &Path, output_path: &Path) -> Result<BackupResult> {
        let start_time = Instant::now();

        let file = File::create(output_path).with_path(output_path)?;
        let writer = self.write_entries(source_dir, BufWriter::new(file))?;
        let stats = writer.stats();
        let mut out = writer.finish().with_path(output_path)?;
        out.flush().with_path(output_path)?;
        drop(out);

        let size_bytes = fs::metadata(output_path).with_path(output_path)?.len();
        let duration = start_time.elapsed().as_secs_f64();

        tracing::info!(
            "Created {} ({} entries, {} bytes) in {:.2}s",
            output_path.display(),
            stats.entries(),
            size_bytes,
            duration
        );

        Ok(BackupResult {
            archive_path: output_path.to_path_buf(),
            size_bytes,
            entry_count: stats.entries(),
            payload_bytes: stats.payload_bytes,
            targets: self.config.targets,
            duration_seconds: duration,
        })
    }

    /// Runs every planned step into `dest` and returns the writer before
    /// its trailer is written.
    fn write_entries<W: Write>(&self, source_dir: &Path, dest: W) -> Result<ArchiveWriter<W>> {
        require_directory(source_dir)?;

        let mut session = Session {
            writer: ArchiveWriter::new(dest, self.config.compression_level),
            source_root: source_dir,
            base: &self.config.archive_base,
        };

        for step in plan(&self.config.targets) {
            tracing::info!("Backing up {}", step);
            session.run(step)?;
        }

        Ok(session.writer)
    }
}

/// Builds a backup of `source_dir` at `output_path` and returns the archive
/// path.
///
/// `target_spec` is a comma-separated target list (empty means `default`)
/// and `archive_base` the prefix for every entry path.
pub fn build_backup(
    source_dir: &Path,
    target_spec: &str,
    archive_base: &str,
    output_path: &Path,
) -> Result<PathBuf> {
    let config = BackupConfig::from_spec(target_spec)?.with_archive_base(archive_base);
    let result = BackupBuilder::new(config).create(source_dir, output_path)?;
    Ok(result.archive_path)
}

fn require_directory(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).with_path(path)?;
    if !metadata.is_dir() {
        return Err(Error::io(
            path,
            io::Error::new(io::ErrorKind::NotADirectory, "source is not a directory"),
        ));
    }
    Ok(())
}

/// Writer state shared by the steps of one run.
struct Session<'a, W: Write> {
    writer: ArchiveWriter<W>,
    source_root: &'a Path,
    base: &'a ArchiveBase,
}

impl<W: Write> Session<'_, W> {
    fn run(&mut self, step: BackupStep) -> Result<()> {
        match step {
            BackupStep::Tree => self.backup_dir(Path::new(""), true),
            BackupStep::Root => self.backup_root(),
            BackupStep::Directory(name) => self.backup_dir(Path::new(name), false),
            BackupStep::FilePattern(pattern) => self.backup_file_pattern(pattern),
            BackupStep::File(name) => self.backup_file(Path::new(name)).map(|_| ()),
            BackupStep::Database => self.backup_db(),
        }
    }

    fn backup_root(&mut self) -> Result<()> {
        if self.base.is_empty() {
            tracing::debug!("Archive base is empty, no root entry");
            return Ok(());
        }

        let metadata = fs::metadata(self.source_root).with_path(self.source_root)?;
        self.writer.append_directory(&ArchiveEntry::directory(
            self.base.entry_path(Path::new("")),
            mtime_of(&metadata),
            metadata_of(&metadata),
        ))
    }

    fn backup_dir(&mut self, subtree: &Path, skip_database: bool) -> Result<()> {
        let written = walk_tree(
            &mut self.writer,
            self.source_root,
            subtree,
            self.base,
            WalkOptions { skip_database },
        )?;
        tracing::debug!(
            "Wrote {} entries from {}",
            written,
            self.source_root.join(subtree).display()
        );
        Ok(())
    }

    /// Returns false if the file does not exist.
    fn backup_file(&mut self, relative: &Path) -> Result<bool> {
        let path = self.source_root.join(relative);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} not found, skipping", path.display());
                return Ok(false);
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        append_with_metadata(&mut self.writer, &path, relative, self.base, &metadata)?;
        Ok(true)
    }

    fn backup_file_pattern(&mut self, pattern: &str) -> Result<()> {
        let root = self.source_root.to_str().ok_or_else(|| Error::NonUtf8Path {
            path: self.source_root.to_path_buf(),
        })?;
        let full_pattern = format!(
            "{}/{}",
            glob::Pattern::escape(root.trim_end_matches('/')),
            pattern
        );

        let matches = glob::glob(&full_pattern).map_err(|e| Error::Pattern {
            pattern: full_pattern.clone(),
            source: e,
        })?;

        let mut count = 0;
        for entry in matches {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::io(path, e.into())
            })?;
            // Patterns have no directory part: every match sits directly under the root.
            let name = path.file_name().ok_or_else(|| {
                Error::io(
                    &path,
                    io::Error::new(io::ErrorKind::InvalidInput, "glob match has no file name"),
                )
            })?;
            if self.backup_file(Path::new(name))? {
                count += 1;
            }
        }

        tracing::debug!("{} files matched {}", count, pattern);
        Ok(())
    }

    fn backup_db(&mut self) -> Result<()> {
        append_database_snapshot(&mut self.writer, self.source_root, self.base)
    }
}
