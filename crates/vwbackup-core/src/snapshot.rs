//! Point-in-time copies of the live SQLite database.
//!
//! The live file is never read directly. SQLite writes a consistent copy to
//! a temporary path with `VACUUM INTO`, which tolerates concurrent readers
//! and writers, and that copy is what gets archived. The temporary copy is
//! removed on every exit path.

use crate::archive::{ArchiveBase, ArchiveEntry, ArchiveWriter};
use crate::cleanup::{reserve_temp_path, RemoveOnExit};
use crate::error::{Error, IoResultExt, Result};
use crate::metadata::{metadata_of, mtime_of};
use rusqlite::{Connection, OpenFlags};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// File name of the live database inside the source directory.
pub const DATABASE_FILE_NAME: &str = "db.sqlite3";

const SNAPSHOT_TEMP_PREFIX: &str = "vwbdb";

/// Snapshots `<source_root>/db.sqlite3` and appends it to the archive as
/// `<base>db.sqlite3`.
///
/// The entry carries the live file's mode, owner and mtime together with
/// the snapshot's own size.
pub fn append_database_snapshot<W: Write>(
    writer: &mut ArchiveWriter<W>,
    source_root: &Path,
    base: &ArchiveBase,
) -> Result<()> {
    let temp = reserve_temp_path(SNAPSHOT_TEMP_PREFIX)?;
    snapshot_via(writer, source_root, base, &temp)
}

fn snapshot_via<W: Write>(
    writer: &mut ArchiveWriter<W>,
    source_root: &Path,
    base: &ArchiveBase,
    temp: &Path,
) -> Result<()> {
    let guard = RemoveOnExit::new(temp);
    let result = write_snapshot(writer, source_root, base, temp);
    guard.finish(result)
}

fn write_snapshot<W: Write>(
    writer: &mut ArchiveWriter<W>,
    source_root: &Path,
    base: &ArchiveBase,
    temp: &Path,
) -> Result<()> {
    let live = source_root.join(DATABASE_FILE_NAME);
    let live_meta = fs::metadata(&live).with_path(&live)?;

    tracing::debug!("Snapshotting {} into {}", live.display(), temp.display());
    vacuum_into(&live, temp)?;

    let snapshot = File::open(temp).with_path(temp)?;
    let snapshot_len = snapshot.metadata().with_path(temp)?.len();

    let entry = ArchiveEntry::file(
        base.entry_path(Path::new(DATABASE_FILE_NAME)),
        snapshot_len,
        mtime_of(&live_meta),
        metadata_of(&live_meta),
    );
    tracing::debug!(
        "Adding database snapshot {} ({} bytes, live file {} bytes)",
        entry.path.display(),
        snapshot_len,
        live_meta.len()
    );

    writer.append_file(&entry, snapshot)
}

/// Writes a transactionally consistent copy of the database at `live` to
/// `dest`, which must not exist yet.
pub fn vacuum_into(live: &Path, dest: &Path) -> Result<()> {
    let dest_str = dest.to_str().ok_or_else(|| Error::NonUtf8Path {
        path: dest.to_path_buf(),
    })?;

    let conn = Connection::open_with_flags(
        live,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| Error::snapshot(live, e))?;

    conn.execute("VACUUM INTO ?1", [dest_str])
        .map_err(|e| Error::snapshot(live, e))?;

    conn.close().map_err(|(_, e)| Error::snapshot(live, e))
}
