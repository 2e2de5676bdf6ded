// SPDX-License-Identifier: MIT

//! The twelve host-facing operations, each a method on
//! [`BurstBufferPlugin`]. Staging work is dispatched to the engine's
//! detached workers — no facade operation blocks on an external command —
//! except the two submission-time calls inside `validate2`, which are
//! awaited inline since the host needs their output, the env-vars `paths`
//! reports, before the job can proceed.

use crate::plugin::BurstBufferPlugin;
use crate::tres::bytes_to_mb;
use bb_adapters::CommandRunner;
use bb_core::{AllocationKey, BbError, BufferPlan, BufferState, Clock, HostJobLock, HostJobQuery, JobId, UserId};
use bb_engine::{AdmitDecision, Host};
use bb_storage::SnapshotIo;
use serde::Serialize;

/// One year, in seconds — the "never" estimate `get_est_start` returns for
/// a job the planner says cannot ever fit without more preemption than it
/// found.
const NO_ESTIMATE_SECS: u64 = 365 * 24 * 3600;

/// A pending job the host wants considered for stage-in this tick, in the
/// priority order the host's own queue already sorted it into. Node
/// hostnames are supplied here rather than looked up, per the host's
/// exclusion of the host's job-record structure.
#[derive(Debug, Clone)]
pub struct StageInCandidate {
    pub job_id: JobId,
    pub uid: u32,
    pub node_hostnames: Vec<String>,
}

/// Public view of one allocation for operator queries. Packing this into
/// the host's own RPC/CLI wire format is out of scope; this is the data
/// that packing would consume.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationView {
    pub owner: u32,
    pub job_id: Option<String>,
    pub name: Option<String>,
    pub size: u64,
    pub account: String,
    pub partition: String,
    pub qos: String,
    pub state: String,
}

impl<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> BurstBufferPlugin<R, C, H, IO> {
    /// Parse the job's directives, reject outright if the request alone
    /// could never fit under the user's limit, and cache the plan under
    /// `job_id` in `pending` state. Permission and limit errors are
    /// returned synchronously from `validate`, before the job ever enters
    /// the plan table. Returns the canonical string the host stores on the
    /// job record for `validate2` and later phases, or `None` if the job
    /// made no burst-buffer request at all.
    pub fn validate(&self, job_id: &JobId, uid: u32, script_body: &str, node_count: u32) -> Result<Option<String>, BbError> {
        let cfg = self.runtime().config();
        if !cfg.is_permitted(uid) {
            return Err(BbError::PermissionDenied(format!("uid {uid} is not permitted to request burst buffers")));
        }
        let spec = bb_directive::parse_script_directives(script_body, uid, cfg)?;
        if spec.is_empty() {
            return Ok(None);
        }

        let total_size = spec.total_size_bytes(node_count);
        if let Some(limit) = cfg.user_size_limit {
            if total_size > limit {
                return Err(BbError::LimitExceeded(format!(
                            "requested {total_size} bytes exceeds the per-user limit of {limit} bytes"
                        )));
            }
        }

        let canonical = bb_directive::encode_canonical(&spec, node_count);
        let (account, partition, qos) = self
        .runtime()
        .host()
        .job_info(job_id)
        .map(|i| (i.account, i.partition, i.qos))
        .unwrap_or_default();

        let plan = BufferPlan {
            job_id: job_id.clone(),
            user_id: UserId::new(uid),
            account,
            partition,
            qos,
            total_size,
            swap_gib: spec.swap_gib.unwrap_or(0),
            swap_node_count: node_count,
            access_mode: spec.job_scratch.as_ref().and_then(|j| j.access_mode.clone()),
            buffer_type: spec.job_scratch.as_ref().and_then(|j| j.buffer_type.clone()),
            gres: spec.gres_requests(),
            persistent_ops: spec.persistent_ops(),
            state: BufferState::Pending,
            canonical: canonical.clone(),
            state_entered_at: self.runtime().clock().now_epoch_secs(),
            state_reason: None,
            state_desc: None,
        };
        self.runtime().lock_state_mut(|s| s.upsert_plan(plan));
        Ok(Some(canonical))
    }

    /// Write the job's on-disk artifacts, run the submission-time
    /// `job_process`/`paths` pair, and launch an immediate stage-in
    /// attempt in the background. Returns the
    /// environment variables `paths` reported, for the host to inject into
    /// the job.
    pub async fn validate2(&self, job_id: &JobId, script_body: &str, node_hostnames: Vec<String>) -> Result<Vec<(String, String)>, BbError> {
        let uid = self
        .runtime()
        .lock_state(|s| s.plan(job_id).map(|p| p.user_id.get()))
        .ok_or_else(|| BbError::InvalidRequest(format!("unknown job {job_id}")))?;

        let env = self.runtime().prepare_submission_artifacts(job_id, script_body).await?;

        let job_id = job_id.clone();
        self.runtime().dispatch_step(move |rt| async move { rt.stage_in(&job_id, uid, &node_hostnames).await });
        Ok(env)
    }

    /// Report the buffer request as whole megabytes for the job's TRES
    /// accounting vector.
    pub fn set_tres_cnt(&self, job_id: &JobId) -> u64 {
        self.runtime().lock_state(|s| s.plan(job_id).map(|p| bytes_to_mb(p.total_size)).unwrap_or(0))
    }

    /// Estimate when the job could start: now if it would be admitted
    /// today, one second from now if it is merely over a configured limit,
    /// or effectively never if no amount of preemption would make room.
    pub fn get_est_start(&self, job_id: &JobId) -> u64 {
        let now = self.runtime().clock().now_epoch_secs();
        let Some(plan) = self.runtime().lock_state(|s| s.plan(job_id).cloned()) else {
            return now;
        };
        let decision = self
        .runtime()
        .lock_state(|s| bb_engine::evaluate(s, self.runtime().config(), self.runtime().host(), now, &plan))
        .decision();
        match decision {
            AdmitDecision::Admit => now,
            AdmitDecision::Skip => now + 1,
            AdmitDecision::Stop => now + NO_ESTIMATE_SECS,
        }
    }

    /// Walk `queue` in the host's priority order, admitting and launching
    /// stage-in for every candidate the planner clears, preempting any
    /// victims it names along the way, and stopping at the first candidate
    /// the planner says can never fit. Returns the job ids admitted this
    /// pass.
    pub async fn try_stage_in(&self, queue: &[StageInCandidate]) -> Vec<JobId> {
        let now = self.runtime().clock().now_epoch_secs();
        let mut admitted = Vec::new();

        for candidate in queue {
            let _job_lock = self.runtime().host().write_lock(&candidate.job_id).await;
            let Some(plan) = self.runtime().lock_state(|s| s.plan(&candidate.job_id).cloned()) else {
                continue;
            };
            let outcome = self.runtime().lock_state(|s| bb_engine::evaluate(s, self.runtime().config(), self.runtime().host(), now, &plan));

            match outcome.decision() {
                AdmitDecision::Admit if outcome.preempt.is_empty() => {
                    admitted.push(candidate.job_id.clone());
                    let job_id = candidate.job_id.clone();
                    let uid = candidate.uid;
                    let nodes = candidate.node_hostnames.clone();
                    self.runtime().dispatch_step(move |rt| async move { rt.stage_in(&job_id, uid, &nodes).await });
                }
                AdmitDecision::Admit => {
                    // Deficits are covered only by victims not yet torn
                    // down; enqueue the hurried teardowns and leave the
                    // candidate pending. The caller may invoke the test
                    // again on the next tick to start the job.
                    for victim in &outcome.preempt {
                        if let AllocationKey::JobScratch(victim_job) = victim {
                            let victim_job = victim_job.clone();
                            self.runtime().dispatch_step(move |rt| async move { rt.teardown(&victim_job, true).await });
                        }
                    }
                }
                AdmitDecision::Skip => continue,
                AdmitDecision::Stop => break,
            }
        }

        admitted
    }

    /// `1` staged in, `0` still in progress, `-1` not started or errored.
    pub fn test_stage_in(&self, job_id: &JobId) -> i32 {
        match self.runtime().lock_state(|s| s.plan(job_id).cloned()) {
            None => -1,
            Some(p) if p.state_reason.is_some() => -1,
            Some(p) if p.state >= BufferState::StagedIn => 1,
            Some(_) => 0,
        }
    }

    /// Write the allocated node list, run `pre_run`, and mark the plan
    /// running.
    pub fn begin(&self, job_id: &JobId, node_hostnames: Vec<String>) {
        let job_id = job_id.clone();
        self.runtime().dispatch_step(move |rt| async move { rt.begin(&job_id, &node_hostnames).await });
    }

    /// Enqueue the stage-out → post-run → teardown pipeline.
    pub fn start_stage_out(&self, job_id: &JobId) {
        let job_id = job_id.clone();
        self.runtime().dispatch_step(move |rt| async move { rt.stage_out(&job_id).await });
    }

    /// `1` torn down, `0` still in progress, `-1` not started or errored.
    pub fn test_stage_out(&self, job_id: &JobId) -> i32 {
        match self.runtime().lock_state(|s| s.plan(job_id).cloned()) {
            None => -1,
            Some(p) if p.state_reason.is_some() => -1,
            Some(p) if p.state == BufferState::Complete => 1,
            Some(_) => 0,
        }
    }

    /// Force a hurried teardown regardless of phase.
    pub fn cancel(&self, job_id: &JobId) {
        let job_id = job_id.clone();
        self.runtime().dispatch_step(move |rt| async move { rt.teardown(&job_id, true).await });
    }

    /// Snapshot of every allocation visible to `uid` — its own, or all of
    /// them if `uid` is privileged — for operator queries.
    pub fn state_pack(&self, uid: u32) -> Vec<AllocationView> {
        let privileged = self.runtime().config().is_privileged(uid);
        self.runtime().lock_state(|s| {
            s.allocations()
            .filter(|a| privileged || a.owner.get() == uid)
            .map(|a| AllocationView {
                owner: a.owner.get(),
                job_id: a.job_id.as_ref().map(|j| j.as_str().to_string()),
                name: a.name.clone(),
                size: a.size,
                account: a.account.clone(),
                partition: a.partition.clone(),
                qos: a.qos.clone(),
                state: a.state.to_string(),
            })
            .collect()
        })
    }

    /// Convert a canonical burst-buffer string directly into a TRES=count
    /// string in MB, without needing a cached plan.
    pub fn xlate_bb_2_tres_str(&self, canonical: &str, node_count: u32) -> Result<String, BbError> {
        let spec = bb_directive::decode_canonical(canonical)?;
        Ok(format!("TRES={}", bytes_to_mb(spec.total_size_bytes(node_count))))
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
