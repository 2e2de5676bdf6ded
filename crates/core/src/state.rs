// SPDX-License-Identifier: MIT

//! Lifecycle state shared by `BufferPlan` and `PersistentOp`.

use serde::{Deserialize, Serialize};

/// States a job-scratch plan or a persistent sub-operation passes through.
///
/// Ordered so that `state < BufferState::StagingIn` and
/// `state >= BufferState::StagedIn` are meaningful comparisons. The
/// discriminant order below *is* that ordering; do not reorder variants
/// without re-checking every `<`/`>=` comparison site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    Pending,
    Allocating,
    Allocated,
    StagingIn,
    StagedIn,
    Running,
    StagingOut,
    Teardown,
    Deleting,
    Deleted,
    Complete,
}

impl BufferState {
    /// States in which a sub-operation (persistent create/destroy) is still
    /// considered "active" and therefore blocks its parent plan from
    /// leaving `Allocating`/`Deleting`.
    pub const ACTIVE_SUBOP_STATES: [BufferState; 4] = [
        BufferState::Pending,
        BufferState::Allocating,
        BufferState::Deleting,
        BufferState::Teardown,
    ];

    pub fn is_active_suboperation(&self) -> bool {
        Self::ACTIVE_SUBOP_STATES.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BufferState::Complete | BufferState::Deleted)
    }
}

impl std::fmt::Display for BufferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BufferState::Pending => "pending",
            BufferState::Allocating => "allocating",
            BufferState::Allocated => "allocated",
            BufferState::StagingIn => "staging_in",
            BufferState::StagedIn => "staged_in",
            BufferState::Running => "running",
            BufferState::StagingOut => "staging_out",
            BufferState::Teardown => "teardown",
            BufferState::Deleting => "deleting",
            BufferState::Deleted => "deleted",
            BufferState::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
