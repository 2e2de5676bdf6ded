// SPDX-License-Identifier: MIT

//! Run the external data-movement CLI as a subprocess with a timeout:
//! argv-vector + absolute path to the CLI + timeout in milliseconds,
//! returning (exit status, captured stdout).

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Result of running one external-command invocation.
///
/// `status` is a real process exit code, or a synthetic nonzero value
/// (`TIMEOUT_STATUS` / `SPAWN_FAILED_STATUS`) when the child never produced
/// one — the contract returns a status rather than an error so callers
/// (teardown's "token not found" exemption, the planner's retry logic) can
/// treat every outcome uniformly.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Synthetic status used when the timeout elapses before the child exits.
pub const TIMEOUT_STATUS: i32 = -1;
/// Synthetic status used when the child could not even be spawned.
pub const SPAWN_FAILED_STATUS: i32 = -2;

/// Runs an argv vector against an absolute binary path, subject to a
/// timeout. Implementations must be safely callable from multiple
/// concurrent workers.
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(&self, cli_path: &Path, args: &[String], timeout: Duration) -> CommandOutput;
}

/// Spawns the real external CLI via [`tokio::process::Command`].
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cli_path: &Path, args: &[String], timeout: Duration) -> CommandOutput {
        let mut cmd = Command::new(cli_path);
        cmd.args(args);

        tracing::debug!(cli = %cli_path.display(), ?args, "invoking external command");

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let status = output.status.code().unwrap_or(TIMEOUT_STATUS);
                tracing::debug!(status, stdout_len = stdout.len(), "external command finished");
                CommandOutput { status, stdout, stderr }
            }
            Ok(Err(io_err)) => {
                tracing::error!(cli = %cli_path.display(), error = %io_err, "failed to spawn external command");
                CommandOutput {
                    status: SPAWN_FAILED_STATUS,
                    stdout: String::new(),
                    stderr: io_err.to_string(),
                }
            }
            Err(_elapsed) => {
                tracing::error!(cli = %cli_path.display(), ?args, timeout_ms = timeout.as_millis(), "external command timed out");
                CommandOutput {
                    status: TIMEOUT_STATUS,
                    stdout: String::new(),
                    stderr: format!("timed out after {}ms", timeout.as_millis()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
