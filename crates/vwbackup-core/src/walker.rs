//! Recursive filesystem enumeration into an archive.

use crate::archive::{ArchiveBase, ArchiveEntry, ArchiveWriter};
use crate::error::{Error, IoResultExt, Result};
use crate::metadata::{metadata_of, mtime_of};
use crate::snapshot::DATABASE_FILE_NAME;
use std::fs::{self, File, Metadata};
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;

/// Options for a single subtree walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Omit non-directory entries whose relative path ends with the live
    /// database file name.
    pub skip_database: bool,
}

/// Writes `subtree` (relative to `source_root`, empty for the whole root)
/// and every descendant into the archive.
///
/// Entries are emitted depth-first, sorted by file name inside each
/// directory. Symlinks are not followed. A subtree that does not exist is
/// skipped without error; any other stat or read failure aborts the walk.
///
/// Returns the number of entries written.
pub fn walk_tree<W: Write>(
    writer: &mut ArchiveWriter<W>,
    source_root: &Path,
    subtree: &Path,
    base: &ArchiveBase,
    options: WalkOptions,
) -> Result<usize> {
    let start = source_root.join(subtree);

    match fs::symlink_metadata(&start) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Skipping non-existent path: {}", start.display());
            return Ok(0);
        }
        Err(e) => return Err(Error::io(&start, e)),
    }

    let mut written = 0;

    for entry in WalkDir::new(&start).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Walk {
            path: start.clone(),
            source: e,
        })?;

        let relative = entry.path().strip_prefix(source_root).map_err(|_| {
            Error::io(
                entry.path(),
                io::Error::new(io::ErrorKind::InvalidData, "walked path is outside the source root"),
            )
        })?;
        let metadata = entry.metadata().map_err(|e| Error::Walk {
            path: entry.path().to_path_buf(),
            source: e,
        })?;

        if metadata.is_dir() {
            if base.is_empty() && relative.as_os_str().is_empty() {
                // The source root itself has no name inside a prefix-less archive.
                continue;
            }

            let entry_path = base.entry_path(relative);
            tracing::debug!("Adding directory {}", entry_path.display());
            writer.append_directory(&ArchiveEntry::directory(
                entry_path,
                mtime_of(&metadata),
                metadata_of(&metadata),
            ))?;
            written += 1;
            continue;
        }

        if options.skip_database && relative.to_string_lossy().ends_with(DATABASE_FILE_NAME) {
            tracing::debug!("Skipping live database {}", entry.path().display());
            continue;
        }

        append_with_metadata(writer, entry.path(), relative, base, &metadata)?;
        written += 1;
    }

    Ok(written)
}

/// Writes one non-directory object as a file entry using the supplied
/// metadata for its header, streaming its content from `path`.
pub(crate) fn append_with_metadata<W: Write>(
    writer: &mut ArchiveWriter<W>,
    path: &Path,
    relative: &Path,
    base: &ArchiveBase,
    metadata: &Metadata,
) -> Result<()> {
    let entry = ArchiveEntry::file(
        base.entry_path(relative),
        metadata.len(),
        mtime_of(metadata),
        metadata_of(metadata),
    );
    tracing::debug!("Adding file {} ({} bytes)", entry.path.display(), entry.size);

    let file = File::open(path).with_path(path)?;
    writer.append_file(&entry, file)
}
