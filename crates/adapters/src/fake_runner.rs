// SPDX-License-Identifier: MIT

//! A scripted, in-memory [`CommandRunner`] for tests.

use crate::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct RunnerCall {
    pub cli_path: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

struct FakeRunnerState {
    calls: Vec<RunnerCall>,
    /// Scripted responses keyed by the `--function` argument; consumed
    /// front-to-back so a test can queue a sequence per function.
    responses: HashMap<String, Vec<CommandOutput>>,
    default_response: CommandOutput,
}

/// Records every call and serves scripted [`CommandOutput`]s back, keyed by
/// the `--function <name>` argument pair.
#[derive(Clone)]
pub struct FakeRunner {
    inner: Arc<Mutex<FakeRunnerState>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeRunnerState {
                    calls: Vec::new(),
                    responses: HashMap::new(),
                    default_response: CommandOutput {
                        status: 0,
                        stdout: String::new(),
                        stderr: String::new(),
                    },
                })),
        }
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.inner.lock().calls.clone()
    }

    /// Queue a response for the next invocation of `--function <function>`.
    pub fn queue(&self, function: &str, output: CommandOutput) {
        self.inner
        .lock()
        .responses
        .entry(function.to_string())
        .or_default()
        .push(output);
    }

    pub fn queue_success(&self, function: &str, stdout: impl Into<String>) {
        self.queue(
            function,
            CommandOutput {
                status: 0,
                stdout: stdout.into(),
                stderr: String::new(),
            },
        );
    }

    pub fn queue_failure(&self, function: &str, status: i32, stderr: impl Into<String>) {
        self.queue(
            function,
            CommandOutput {
                status,
                stdout: String::new(),
                stderr: stderr.into(),
            },
        );
    }
}

fn function_of(args: &[String]) -> Option<&str> {
    args.iter()
    .position(|a| a == "--function")
    .and_then(|i| args.get(i + 1))
    .map(|s| s.as_str())
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, cli_path: &Path, args: &[String], timeout: Duration) -> CommandOutput {
        let mut inner = self.inner.lock();
        inner.calls.push(RunnerCall {
            cli_path: cli_path.to_path_buf(),
            args: args.to_vec(),
            timeout,
        });

        let function = function_of(args).map(|s| s.to_string());
        if let Some(function) = function {
            if let Some(queue) = inner.responses.get_mut(&function) {
                if !queue.is_empty() {
                    return queue.remove(0);
                }
            }
        }
        inner.default_response.clone()
    }
}

#[cfg(test)]
#[path = "fake_runner_tests.rs"]
mod tests;
