// SPDX-License-Identifier: MIT

//! Error kinds shared across every burst-buffer component.

use thiserror::Error;

/// Error kinds returned by the burst-buffer core.
///
/// Parse and permission errors are synchronous: they are returned from
/// `validate` before a job ever enters the plan table. `LimitExceeded` and
/// `NoCapacity` are not terminal — the planner returns them and the caller
/// reconsiders the job on the next tick.
#[derive(Debug, Error)]
pub enum BbError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("insufficient capacity: {0}")]
    NoCapacity(String),

    #[error("external command '{function}' failed (status {status:?}): {stderr}")]
    ExternalError {
        function: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("snapshot I/O error: {0}")]
    SnapshotIo(String),

    #[error("timeout running '{function}' after {timeout_ms}ms")]
    Timeout { function: String, timeout_ms: u64 },
}

impl BbError {
    /// True when the stderr of a failed command matches the well-known
    /// "token not found" exemption: teardown against a
    /// token the external subsystem has no record of is treated as success.
    pub fn is_token_not_found(stderr: &str) -> bool {
        stderr.to_ascii_lowercase().contains("token not found")
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
