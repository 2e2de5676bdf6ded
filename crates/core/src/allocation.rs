// SPDX-License-Identifier: MIT

//! `Allocation`: one live buffer, job-scratch or persistent.

use crate::id::{JobId, UserId};
use crate::state::BufferState;
use serde::{Deserialize, Serialize};

/// Identifies an allocation the way the external subsystem's session token
/// does: by job id for job-scratch, or by (user, name) for a persistent
/// buffer — persistent-buffer names are unique per (user id, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationKey {
    JobScratch(JobId),
    Persistent(UserId, String),
}

impl std::fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationKey::JobScratch(id) => write!(f, "job:{id}"),
            AllocationKey::Persistent(uid, name) => write!(f, "persistent:{uid}:{name}"),
        }
    }
}

/// A weak, non-owning reference into the accounting subsystem (owned
/// elsewhere). Modeled as a lookup key plus an opaque cached handle that is
/// invalidated on every agent pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociationRef {
    pub key: String,
    #[serde(skip)]
    pub cached: Option<AssociationHandle>,
}

impl AssociationRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cached: None,
        }
    }

    /// Drop the cached handle; called at the start of each background-agent
    /// pass so a stale handle from a deleted accounting record is never used.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Opaque, non-owning accounting handle. Its internals belong to the
/// accounting subsystem; the core only ever moves it around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationHandle(pub u64);

/// One live buffer: either job-scratch (non-zero job id) or persistent
/// (job id absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub owner: UserId,
    pub job_id: Option<JobId>,
    pub name: Option<String>,
    pub size: u64,
    pub account: String,
    pub partition: String,
    pub qos: String,
    pub create_time: u64,
    pub last_seen: u64,
    pub state: BufferState,
    pub association: AssociationRef,
    /// True once this allocation's size has been charged against
    /// `used_space`; reservation-held space is tracked
    /// separately and never flips this.
    pub charged: bool,
}

impl Allocation {
    pub fn key(&self) -> AllocationKey {
        match (&self.job_id, &self.name) {
            (Some(job_id), _) => AllocationKey::JobScratch(job_id.clone()),
            (None, Some(name)) => AllocationKey::Persistent(self.owner, name.clone()),
            (None, None) => AllocationKey::Persistent(self.owner, String::new()),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.job_id.is_none()
    }
}

#[cfg(test)]
#[path = "allocation_tests.rs"]
mod tests;
