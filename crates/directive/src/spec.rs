// SPDX-License-Identifier: MIT

//! The normalized, in-memory form of a job's burst-buffer request, before
//! it is folded into a `bb_core::BufferPlan`.

use bb_core::{GresRequest, PersistentOp, PersistentOpKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobScratchRequest {
    pub bytes: u64,
    pub access_mode: Option<String>,
    pub buffer_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferSpec {
    pub job_scratch: Option<JobScratchRequest>,
    pub gres_nodes: Option<u32>,
    pub swap_gib: Option<u32>,
    pub persistent_creates: Vec<PersistentCreate>,
    pub persistent_destroys: Vec<PersistentDestroy>,
    pub persistent_uses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentCreate {
    pub name: String,
    pub size: u64,
    pub access_mode: Option<String>,
    pub buffer_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentDestroy {
    pub name: String,
    pub hurry: bool,
}

impl BufferSpec {
    pub fn is_empty(&self) -> bool {
        self.job_scratch.is_none()
        && self.gres_nodes.is_none()
        && self.swap_gib.is_none()
        && self.persistent_creates.is_empty()
        && self.persistent_destroys.is_empty()
        && self.persistent_uses.is_empty()
    }

    /// Total job-scratch byte size with swap rolled in:
    /// `swap_gib * node_count * 2^30`.
    pub fn total_size_bytes(&self, node_count: u32) -> u64 {
        let base = self.job_scratch.as_ref().map(|j| j.bytes).unwrap_or(0);
        let swap_bytes = self.swap_gib.unwrap_or(0) as u64 * node_count as u64 * (1u64 << 30);
        base + swap_bytes
    }

    pub fn gres_requests(&self) -> Vec<GresRequest> {
        match self.gres_nodes {
            Some(n) => vec![GresRequest {
                name: "nodes".to_string(),
                count: n as u64,
            }],
            None => vec![],
        }
    }

    pub fn persistent_ops(&self) -> Vec<PersistentOp> {
        let mut ops = Vec::new();
        for create in &self.persistent_creates {
            ops.push(PersistentOp {
                name: create.name.clone(),
                op: PersistentOpKind::Create,
                size: create.size,
                access_mode: create.access_mode.clone(),
                buffer_type: create.buffer_type.clone(),
                hurry: false,
                state: bb_core::BufferState::Pending,
            });
        }
        for destroy in &self.persistent_destroys {
            ops.push(PersistentOp {
                name: destroy.name.clone(),
                op: PersistentOpKind::Destroy,
                size: 0,
                access_mode: None,
                buffer_type: None,
                hurry: destroy.hurry,
                state: bb_core::BufferState::Pending,
            });
        }
        for name in &self.persistent_uses {
            ops.push(PersistentOp {
                name: name.clone(),
                op: PersistentOpKind::Use,
                size: 0,
                access_mode: None,
                buffer_type: None,
                hurry: false,
                state: bb_core::BufferState::Pending,
            });
        }
        ops
    }
}
