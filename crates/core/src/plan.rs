// SPDX-License-Identifier: MIT

//! `BufferPlan`: the per-job burst-buffer request.

use crate::id::{JobId, UserId};
use crate::state::BufferState;
use serde::{Deserialize, Serialize};

/// A requested generic resource, e.g. `{name: "ssd", count: 4}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GresRequest {
    pub name: String,
    pub count: u64,
}

/// What a persistent sub-operation does to a named buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistentOpKind {
    Create,
    Destroy,
    Use,
}

/// One `create_persistent` / `destroy_persistent` / `persistentdw` directive
/// embedded in a job's plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentOp {
    pub name: String,
    pub op: PersistentOpKind,
    pub size: u64,
    pub access_mode: Option<String>,
    pub buffer_type: Option<String>,
    pub hurry: bool,
    /// Sub-operation's own progress; the parent plan cannot leave
    /// `Allocating`/`Deleting` until every sub-op leaves the active set.
    pub state: BufferState,
}

impl PersistentOp {
    pub fn create(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            op: PersistentOpKind::Create,
            size,
            access_mode: None,
            buffer_type: None,
            hurry: false,
            state: BufferState::Pending,
        }
    }

    pub fn destroy(name: impl Into<String>, hurry: bool) -> Self {
        Self {
            name: name.into(),
            op: PersistentOpKind::Destroy,
            size: 0,
            access_mode: None,
            buffer_type: None,
            hurry,
            state: BufferState::Pending,
        }
    }

    pub fn uses(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: PersistentOpKind::Use,
            size: 0,
            access_mode: None,
            buffer_type: None,
            hurry: false,
            state: BufferState::Pending,
        }
    }
}

/// Per-job burst-buffer request, cached under job id from first admission
/// inspection of the job's directive until teardown-complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferPlan {
    pub job_id: JobId,
    pub user_id: UserId,
    pub account: String,
    pub partition: String,
    pub qos: String,
    /// Total job-scratch size in bytes, swap already rolled in.
    pub total_size: u64,
    pub swap_gib: u32,
    pub swap_node_count: u32,
    pub access_mode: Option<String>,
    pub buffer_type: Option<String>,
    pub gres: Vec<GresRequest>,
    pub persistent_ops: Vec<PersistentOp>,
    pub state: BufferState,
    /// The durable canonical representation; all later phases
    /// re-read this rather than the raw directive text.
    pub canonical: String,
    /// Epoch seconds the plan entered its current state (for timeout checks).
    pub state_entered_at: u64,
    pub state_reason: Option<String>,
    pub state_desc: Option<String>,
}

impl BufferPlan {
    /// `add_space` from: the plan's own request plus every
    /// embedded persistent create.
    pub fn add_space(&self) -> u64 {
        self.total_size
        + self
        .persistent_ops
        .iter()
        .filter(|p| p.op == PersistentOpKind::Create)
        .map(|p| p.size)
        .sum::<u64>()
    }

    /// True once every persistent sub-operation has left the active set,
    /// i.e. the plan may leave `Allocating`/`Deleting`.
    pub fn all_suboperations_settled(&self) -> bool {
        self.persistent_ops
        .iter()
        .all(|op| !op.state.is_active_suboperation())
    }

    pub fn has_buffer_request(&self) -> bool {
        self.total_size > 0 || !self.gres.is_empty() || !self.persistent_ops.is_empty()
    }
}

/// Round a byte size up to the nearest multiple of `granularity`.
/// Allocation size is always rounded up to the pool granularity.
pub fn round_up_to_granularity(size: u64, granularity: u64) -> u64 {
    if granularity == 0 {
        return size;
    }
    size.div_ceil(granularity) * granularity
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
