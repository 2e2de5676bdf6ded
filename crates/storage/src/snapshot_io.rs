// SPDX-License-Identifier: MIT

//! Persist the snapshot with the three-file shuffle:
//! write `*.new`, rotate the current file to `*.old`, then rename `*.new`
//! onto the current path — so a concurrent reader always sees a complete
//! file.

use crate::binary::{decode_snapshot, encode_snapshot};
use crate::record::SnapshotRecord;
use bb_core::BbError;
use std::io;
use std::path::{Path, PathBuf};

const SNAPSHOT_STEM: &str = "burst_buffer_cray_state";

fn snapshot_paths(state_save_dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (
        state_save_dir.join(SNAPSHOT_STEM),
        state_save_dir.join(format!("{SNAPSHOT_STEM}.old")),
        state_save_dir.join(format!("{SNAPSHOT_STEM}.new")),
    )
}

/// Abstracts the filesystem operations the snapshot shuffle needs, so
/// tests can exercise the rotation logic without touching disk.
pub trait SnapshotIo: Send + Sync + 'static {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct FsSnapshotIo;

impl SnapshotIo for FsSnapshotIo {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

pub fn write_snapshot<IO: SnapshotIo>(
    io: &IO,
    state_save_dir: &Path,
    records: &[SnapshotRecord],
    emulation: bool,
) -> Result<(), BbError> {
    let (current, old, new) = snapshot_paths(state_save_dir);
    let bytes = encode_snapshot(records, emulation);

    io.write(&new, &bytes).map_err(|e| BbError::SnapshotIo(e.to_string()))?;
    if io.exists(&current) {
        if let Err(e) = io.rename(&current, &old) {
            let _ = io.remove(&new);
            return Err(BbError::SnapshotIo(e.to_string()));
        }
    }
    if let Err(e) = io.rename(&new, &current) {
        let _ = io.remove(&new);
        return Err(BbError::SnapshotIo(e.to_string()));
    }

    tracing::debug!(count = records.len(), path = %current.display(), "wrote burst buffer snapshot");
    Ok(())
}

/// Load the current snapshot. Returns an empty list if none exists yet
/// (first run).
pub fn load_snapshot<IO: SnapshotIo>(
    io: &IO,
    state_save_dir: &Path,
    emulation: bool,
) -> Result<Vec<SnapshotRecord>, BbError> {
    let (current, _old, _new) = snapshot_paths(state_save_dir);
    if !io.exists(&current) {
        return Ok(Vec::new());
    }
    let bytes = io.read(&current).map_err(|e| BbError::SnapshotIo(e.to_string()))?;
    decode_snapshot(&bytes, emulation)
}

#[cfg(test)]
#[path = "snapshot_io_tests.rs"]
mod tests;
