// SPDX-License-Identifier: MIT

//! An in-memory [`SnapshotIo`] for deterministic tests.

use crate::snapshot_io::SnapshotIo;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct FakeSnapshotIo {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    fail_renames_to: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeSnapshotIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    /// Every future `rename(_, to)` call targeting `to` fails without
    /// touching `files`, so a caller's cleanup path can be exercised.
    pub fn fail_rename_to(&self, to: &Path) {
        self.fail_renames_to.lock().insert(to.to_path_buf());
    }
}

impl SnapshotIo for FakeSnapshotIo {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.files.lock().insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.fail_renames_to.lock().contains(to) {
            return Err(io::Error::new(io::ErrorKind::Other, format!("injected rename failure onto {}", to.display())));
        }
        let mut files = self.files.lock();
        let data = files
        .remove(from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{}", from.display())))?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
        .lock()
        .get(path)
        .cloned()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display())))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.files.lock().remove(path);
        Ok(())
    }
}
