// SPDX-License-Identifier: MIT
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bb-adapters: the external-command runner, the `dw_wlm_cli`
//! argv builder, and the Python-repr JSON adapter.

pub mod cli;
pub mod json;
pub mod runner;

pub use cli::{DwWlmClient, NodeList};
pub use json::{normalize_python_repr, Config, Instance, Pool, Session};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, SPAWN_FAILED_STATUS, TIMEOUT_STATUS};

#[cfg(any(test, feature = "test-support"))]
pub mod fake_runner;
#[cfg(any(test, feature = "test-support"))]
pub use fake_runner::{FakeRunner, RunnerCall};
