// SPDX-License-Identifier: MIT
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bb-engine: the job lifecycle state machine, the admission/preemption
//! planner, and the background synchronizer that together make up the
//! burst-buffer orchestration core.

pub mod agent;
pub mod lifecycle;
pub mod paths;
pub mod planner;
pub mod runtime;

pub use lifecycle::FAIL_BURST_BUFFER_OP;
pub use paths::{client_nids_path, job_dir, pathfile_path, script_path};
pub use planner::{evaluate, AdmitDecision, AdmitOutcome};
pub use runtime::{dispatch, Host, Runtime};
