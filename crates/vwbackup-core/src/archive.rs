//! Streaming tar+gzip archive writer.
//!
//! The writer only knows its destination stream. Callers hand it one
//! [`ArchiveEntry`] at a time; directory entries carry no payload and file
//! entries are followed by exactly `size` bytes read from the supplied
//! reader. A reader that ends early or still has data after `size` bytes is
//! rejected with [`Error::SizeMismatch`].

use crate::error::{Error, Result};
use crate::metadata::EntryMetadata;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tar::{Builder as TarBuilder, EntryType, Header};

/// Default gzip level (9 = best compression).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Default prefix under which every entry is nested.
pub const DEFAULT_ARCHIVE_BASE: &str = "data/";

/// Kind of object stored in an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One logical object written to the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, already nested under the archive base
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Payload size in bytes (always 0 for directories)
    pub size: u64,
    /// Modification time, seconds since the Unix epoch
    pub mtime: u64,
    pub metadata: EntryMetadata,
}

impl ArchiveEntry {
    /// Creates a directory entry.
    pub fn directory(path: impl Into<PathBuf>, mtime: u64, metadata: EntryMetadata) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            size: 0,
            mtime,
            metadata,
        }
    }

    /// Creates a file entry with a declared payload size.
    pub fn file(path: impl Into<PathBuf>, size: u64, mtime: u64, metadata: EntryMetadata) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            size,
            mtime,
            metadata,
        }
    }

    fn header(&self) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(match self.kind {
            EntryKind::File => EntryType::Regular,
            EntryKind::Directory => EntryType::Directory,
        });
        header.set_size(self.size);
        header.set_mode(self.metadata.mode);
        header.set_uid(self.metadata.uid);
        header.set_gid(self.metadata.gid);
        header.set_mtime(self.mtime);
        header
    }
}

/// Normalized archive path prefix.
///
/// A non-empty prefix always ends with `/`. Entry paths are built with `/`
/// separators regardless of platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBase(String);

impl ArchiveBase {
    /// Normalizes a configured prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self(prefix)
    }

    /// The normalized prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for an empty prefix (entries at the archive root).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of an entry given its path relative to the source root.
    ///
    /// An empty relative path names the base itself.
    pub fn entry_path(&self, relative: &Path) -> PathBuf {
        let mut out = self.0.clone();
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        out.push_str(&parts.join("/"));
        PathBuf::from(out)
    }
}

impl Default for ArchiveBase {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_BASE)
    }
}

/// Running totals for an archive being written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub directories: usize,
    pub files: usize,
    /// Sum of declared (and written) payload sizes
    pub payload_bytes: u64,
}

impl ArchiveStats {
    /// Total number of entries written.
    pub fn entries(&self) -> usize {
        self.directories + self.files
    }
}

/// Gzip-compressed tar writer over an arbitrary destination stream.
pub struct ArchiveWriter<W: Write> {
    tar: TarBuilder<GzEncoder<W>>,
    stats: ArchiveStats,
}

impl<W: Write> ArchiveWriter<W> {
    /// Creates a writer with the given gzip level (clamped to 1-9).
    pub fn new(dest: W, compression_level: u32) -> Self {
        let encoder = GzEncoder::new(dest, Compression::new(compression_level.clamp(1, 9)));
        Self {
            tar: TarBuilder::new(encoder),
            stats: ArchiveStats::default(),
        }
    }

    /// Writes a directory header with no payload.
    pub fn append_directory(&mut self, entry: &ArchiveEntry) -> Result<()> {
        let mut header = entry.header();
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);

        self.tar
            .append_data(&mut header, &entry.path, io::empty())
            .map_err(|e| Error::io(&entry.path, e))?;

        self.stats.directories += 1;
        Ok(())
    }

    /// Writes a file header followed by exactly `entry.size` bytes from `reader`.
    pub fn append_file<R: Read>(&mut self, entry: &ArchiveEntry, reader: R) -> Result<()> {
        let mut header = entry.header();
        let mut payload = ExactSizeReader::new(reader, entry.size);

        if let Err(e) = self.tar.append_data(&mut header, &entry.path, &mut payload) {
            if payload.ended_early() {
                return Err(Error::SizeMismatch {
                    path: entry.path.clone(),
                    declared: entry.size,
                    provided: payload.provided,
                    more_available: false,
                });
            }
            return Err(Error::io(&entry.path, e));
        }

        if payload.has_trailing_data().map_err(|e| Error::io(&entry.path, e))? {
            return Err(Error::SizeMismatch {
                path: entry.path.clone(),
                declared: entry.size,
                provided: payload.provided,
                more_available: true,
            });
        }

        self.stats.files += 1;
        self.stats.payload_bytes += entry.size;
        Ok(())
    }

    /// Totals so far.
    pub fn stats(&self) -> ArchiveStats {
        self.stats
    }

    /// Writes the tar trailer, flushes the gzip stream and returns the
    /// destination.
    pub fn finish(self) -> io::Result<W> {
        let encoder = self.tar.into_inner()?;
        encoder.finish()
    }
}

/// Reader that yields exactly `declared` bytes and reports a short source
/// as `UnexpectedEof`.
struct ExactSizeReader<R> {
    inner: R,
    remaining: u64,
    provided: u64,
    short: bool,
}

impl<R: Read> ExactSizeReader<R> {
    fn new(inner: R, declared: u64) -> Self {
        Self {
            inner,
            remaining: declared,
            provided: 0,
            short: false,
        }
    }

    fn ended_early(&self) -> bool {
        self.short
    }

    fn has_trailing_data(&mut self) -> io::Result<bool> {
        let mut extra = [0u8; 1];
        loop {
            match self.inner.read(&mut extra) {
                Ok(n) => return Ok(n > 0),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for ExactSizeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            self.short = true;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("payload ended {} bytes before declared size", self.remaining),
            ));
        }

        self.remaining -= n as u64;
        self.provided += n as u64;
        Ok(n)
    }
}
