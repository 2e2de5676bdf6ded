// SPDX-License-Identifier: MIT

//! Trait seams for the collaborators this crate keeps external: the host
//! scheduler's job record, its job-write lock, and its reservation table.
//! These traits are the entire surface this core consumes; the host
//! scheduler's own job queue and config parser are never reimplemented here.

use crate::id::{JobId, UserId};
use async_trait::async_trait;

/// The read-only subset of the host's job record this plugin needs:
/// account/partition/QoS for quota attribution, node count for swap
/// sizing, priority/start_time for the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostJobInfo {
    pub job_id: JobId,
    pub user_id: UserId,
    pub account: String,
    pub partition: String,
    pub qos: String,
    pub node_count: u32,
    pub priority: u32,
    /// Projected/scheduled start time, epoch seconds.
    pub start_time: u64,
}

/// Read access to the host's job table. Never mutated here except for the
/// one narrow case below: refusing an unauthorized persistent destroy
/// holds the job by zeroing its priority.
pub trait HostJobQuery: Send + Sync {
    fn job_info(&self, job_id: &JobId) -> Option<HostJobInfo>;

    /// All job ids currently known to the host (used by the agent to detect
    /// vanished jobs whose buffers should be reclaimed).
    fn known_job_ids(&self) -> Vec<JobId>;

    /// Hold the job (priority = 0) and surface `reason` as its error.
    fn hold_job(&self, job_id: &JobId, reason: &str);
}

/// RAII guard for the host's per-job write lock. Dropping it releases the
/// lock. Lock ordering: always acquire this *before* the core's state
/// mutex, and never hold the state mutex across an external-command call.
pub trait HostJobLockGuard: Send {}

/// The host's reader/writer lock over a single job record.
#[async_trait]
pub trait HostJobLock: Send + Sync {
    async fn write_lock(&self, job_id: &JobId) -> Box<dyn HostJobLockGuard>;
}

/// One entry from the host scheduler's reservation table: an advance
/// promise of resources at a future time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub name: String,
    /// True when this reservation's burst-buffer name matches this
    /// plugin's configured name; `resv_space` only sums over matching
    /// reservations.
    pub matches_plugin: bool,
    pub used_space: u64,
    pub start_time: u64,
}

/// Source of the reservation table the planner consults.
pub trait ReservationSource: Send + Sync {
    fn reservations(&self) -> Vec<Reservation>;
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
