// SPDX-License-Identifier: MIT

//! Per-job on-disk artifact paths: `<state_save_dir>/hash.<jid
//! mod 10>/job.<jid>/{script,client_nids,pathfile}`.

use bb_core::JobId;
use std::path::{Path, PathBuf};

pub fn job_dir(state_save_dir: &Path, job_id: &JobId) -> PathBuf {
    let bucket: u64 = job_id.as_str().parse::<u64>().unwrap_or(0) % 10;
    state_save_dir.join(format!("hash.{bucket}")).join(format!("job.{job_id}"))
}

pub fn script_path(dir: &Path) -> PathBuf {
    dir.join("script")
}

pub fn client_nids_path(dir: &Path) -> PathBuf {
    dir.join("client_nids")
}

pub fn pathfile_path(dir: &Path) -> PathBuf {
    dir.join("pathfile")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
