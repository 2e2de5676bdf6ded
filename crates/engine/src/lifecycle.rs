// SPDX-License-Identifier: MIT

//! Job lifecycle state machine: drives a single `BufferPlan` through its
//! phases, including persistent-buffer create/destroy side-quests, with
//! forced-teardown on any external failure.

use crate::paths::{client_nids_path, job_dir, pathfile_path, script_path};
use crate::runtime::{Host, Runtime};
use bb_adapters::{CommandRunner, NodeList};
use bb_core::{Allocation, AllocationKey, AssociationRef, BbError, BufferState, HostJobLock, PersistentOpKind};
use bb_storage::SnapshotIo;
use std::sync::Arc;

/// `state_reason` recorded whenever an external stage step fails and forces
/// teardown.
pub const FAIL_BURST_BUFFER_OP: &str = "FAIL_BURST_BUFFER_OP";

/// Placeholder pool name for the `--capacity pool:size` flag;
/// this plugin models a single default pool, so the
/// pool component of the flag is always this literal.
const DEFAULT_POOL_NAME: &str = "default";

impl<R: CommandRunner, C: bb_core::Clock, H: Host, IO: SnapshotIo> Runtime<R, C, H, IO> {
    fn transition(&self, job_id: &bb_core::JobId, state: BufferState) {
        let now = self.clock().now_epoch_secs();
        self.lock_state_mut(|s| {
            if let Some(p) = s.plan_mut(job_id) {
                p.state = state;
                p.state_entered_at = now;
            }
        });
    }

    fn write_node_list(&self, job_id: &bb_core::JobId, node_hostnames: &[String]) -> Result<NodeList, BbError> {
        let dir = job_dir(&self.config().state_save_dir, job_id);
        let path = client_nids_path(&dir);
        let contents = node_hostnames.join("\n");
        self.snapshot_io
        .write(&path, contents.as_bytes())
        .map_err(|e| BbError::SnapshotIo(e.to_string()))?;
        Ok(NodeList::NodeHostnameFile(path))
    }

    /// Force the job's buffer into hurried teardown after an external
    /// failure, recording the reason. Called only from within a lifecycle
    /// transition that already holds the job's write lock.
    async fn force_teardown(&self, job_id: &bb_core::JobId, function: &str, stderr: &str) -> Result<(), BbError> {
        let now = self.clock().now_epoch_secs();
        let desc = format!("{function}: {stderr}");
        self.lock_state_mut(|s| {
            if let Some(p) = s.plan_mut(job_id) {
                p.state = BufferState::Teardown;
                p.state_entered_at = now;
                p.state_reason = Some(FAIL_BURST_BUFFER_OP.to_string());
                p.state_desc = Some(desc.clone());
            }
        });
        self.teardown_locked(job_id, true).await
    }

    /// Execute every embedded persistent create/destroy/use sub-operation
    /// that is still active, one step each call. The plan stays in
    /// allocating/deleting until every sub-op leaves the active set.
    /// Idempotent: already-settled sub-ops are skipped.
    pub async fn run_persistent_suboperations(&self, job_id: &bb_core::JobId) -> Result<(), BbError> {
        let (user_id, privileged, pending_ops) = self.lock_state(|s| {
            let plan = s.plan(job_id);
            let uid = plan.map(|p| p.user_id).unwrap_or(bb_core::UserId::new(0));
            let privileged = plan.map(|p| self.config().is_super_user(p.user_id.get())).unwrap_or(false);
            let ops: Vec<_> = plan
            .map(|p| p.persistent_ops.iter().cloned().filter(|op| op.state.is_active_suboperation()).collect())
            .unwrap_or_default();
            (uid, privileged, ops)
        });

        for op in pending_ops {
            match op.op {
                PersistentOpKind::Create => {
                    let timeout = self.config().timeouts.for_function("create_persistent");
                    let out = self
                    .client()
                    .create_persistent(
                        &op.name,
                        user_id.get(),
                        &format!("{DEFAULT_POOL_NAME}:{}", op.size),
                        op.access_mode.as_deref(),
                        op.buffer_type.as_deref(),
                        timeout,
                    )
                    .await;
                    let now = self.clock().now_epoch_secs();
                    if out.success {
                        self.lock_state_mut(|s| {
                            s.insert_allocation(Allocation {
                                owner: user_id,
                                job_id: None,
                                name: Some(op.name.clone()),
                                size: op.size,
                                account: s.plan(job_id).map(|p| p.account.clone()).unwrap_or_default(),
                                partition: s.plan(job_id).map(|p| p.partition.clone()).unwrap_or_default(),
                                qos: s.plan(job_id).map(|p| p.qos.clone()).unwrap_or_default(),
                                create_time: now,
                                last_seen: now,
                                state: BufferState::Complete,
                                association: AssociationRef::new(op.name.clone()),
                                charged: true,
                            });
                            if let Some(p) = s.plan_mut(job_id) {
                                if let Some(sub) = p.persistent_ops.iter_mut().find(|o| o.name == op.name && o.op == PersistentOpKind::Create) {
                                    sub.state = BufferState::Complete;
                                }
                            }
                        });
                        self.mark_dirty();
                    } else {
                        return self.force_teardown(job_id, "create_persistent", &out.stderr).await;
                    }
                }
                PersistentOpKind::Destroy => {
                    let owner_ok = self.lock_state(|s| {
                        s.find_allocation(user_id, &AllocationKey::Persistent(user_id, op.name.clone())).is_some() || privileged
                    });
                    if !owner_ok {
                        self.host().hold_job(job_id, "persistent buffer not owned by requesting user");
                        self.lock_state_mut(|s| {
                            if let Some(p) = s.plan_mut(job_id) {
                                p.state_reason = Some("destroy refused".to_string());
                                if let Some(sub) = p.persistent_ops.iter_mut().find(|o| o.name == op.name && o.op == PersistentOpKind::Destroy) {
                                    sub.state = BufferState::Deleted;
                                }
                            }
                        });
                        continue;
                    }
                    let dir = job_dir(&self.config().state_save_dir, job_id);
                    let script = script_path(&dir);
                    let timeout = self.config().timeouts.for_function("teardown");
                    let out = self.client().teardown(&op.name, &script, op.hurry, timeout).await;
                    if out.success || BbError::is_token_not_found(&out.stderr) {
                        self.lock_state_mut(|s| {
                            s.remove_allocation(user_id, &AllocationKey::Persistent(user_id, op.name.clone()));
                            if let Some(p) = s.plan_mut(job_id) {
                                if let Some(sub) = p.persistent_ops.iter_mut().find(|o| o.name == op.name && o.op == PersistentOpKind::Destroy) {
                                    sub.state = BufferState::Deleted;
                                }
                            }
                        });
                    } else {
                        return self.force_teardown(job_id, "teardown", &out.stderr).await;
                    }
                }
                PersistentOpKind::Use => {
                    self.lock_state_mut(|s| {
                        if let Some(p) = s.plan_mut(job_id) {
                            if let Some(sub) = p.persistent_ops.iter_mut().find(|o| o.name == op.name && o.op == PersistentOpKind::Use) {
                                sub.state = BufferState::Complete;
                            }
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Drive `pending → (allocating →) staging_in → staged_in`.
    /// `node_hostnames` is the allocated node list the host scheduler
    /// assigned to the job — its own job-record structure is out of this
    /// core's scope, so the caller supplies it.
    pub async fn stage_in(&self, job_id: &bb_core::JobId, uid: u32, node_hostnames: &[String]) -> Result<(), BbError> {
        let _job_lock = self.host().write_lock(job_id).await;
        self.transition(job_id, BufferState::Allocating);
        self.run_persistent_suboperations(job_id).await?;

        let settled = self.lock_state(|s| s.plan(job_id).map(|p| p.all_suboperations_settled()).unwrap_or(true));
        if !settled {
            return Ok(());
        }

        let plan = self
        .lock_state(|s| s.plan(job_id).cloned())
        .ok_or_else(|| BbError::InvalidRequest(format!("unknown job {job_id}")))?;

        // A plan carrying only persistent create/destroy/use sub-operations
        // (no job-scratch request of its own) is done once those sub-ops
        // settle; it never enters staging at all.
        if plan.total_size == 0 && plan.gres.is_empty() {
            self.transition(job_id, BufferState::Complete);
            return Ok(());
        }

        self.transition(job_id, BufferState::StagingIn);

        let dir = job_dir(&self.config().state_save_dir, job_id);
        let script = script_path(&dir);
        let node_list = self.write_node_list(job_id, node_hostnames)?;

        let setup_timeout = self.config().timeouts.for_function("setup");
        let capacity = format!("{DEFAULT_POOL_NAME}:{}", plan.total_size);
        let setup_out = self.client().setup(job_id.as_str(), uid, &capacity, &script, Some(&node_list), setup_timeout).await;
        if !setup_out.success {
            return self.force_teardown(job_id, "setup", &setup_out.stderr).await;
        }

        let data_in_timeout = self.config().timeouts.for_function("data_in");
        let data_in_out = self.client().data_in(job_id.as_str(), &script, data_in_timeout).await;
        if !data_in_out.success {
            return self.force_teardown(job_id, "dws_data_in", &data_in_out.stderr).await;
        }

        let now = self.clock().now_epoch_secs();
        self.lock_state_mut(|s| {
            s.insert_allocation(Allocation {
                owner: plan.user_id,
                job_id: Some(job_id.clone()),
                name: None,
                size: plan.total_size,
                account: plan.account.clone(),
                partition: plan.partition.clone(),
                qos: plan.qos.clone(),
                create_time: now,
                last_seen: now,
                state: BufferState::StagedIn,
                association: AssociationRef::default(),
                charged: true,
            });
        });
        self.transition(job_id, BufferState::StagedIn);
        Ok(())
    }

    /// `staged_in → running`.
    pub async fn begin(&self, job_id: &bb_core::JobId, node_hostnames: &[String]) -> Result<(), BbError> {
        let _job_lock = self.host().write_lock(job_id).await;
        let dir = job_dir(&self.config().state_save_dir, job_id);
        let script = script_path(&dir);
        let node_list = self.write_node_list(job_id, node_hostnames)?;
        let timeout = self.config().timeouts.for_function("pre_run");
        let out = self.client().pre_run(job_id.as_str(), &script, Some(&node_list), timeout).await;
        if !out.success {
            return self.force_teardown(job_id, "pre_run", &out.stderr).await;
        }
        self.transition(job_id, BufferState::Running);
        Ok(())
    }

    /// `running → staging_out → teardown → complete`.
    pub async fn stage_out(&self, job_id: &bb_core::JobId) -> Result<(), BbError> {
        let _job_lock = self.host().write_lock(job_id).await;
        self.transition(job_id, BufferState::StagingOut);
        let dir = job_dir(&self.config().state_save_dir, job_id);
        let script = script_path(&dir);

        let data_out_timeout = self.config().timeouts.for_function("data_out");
        let data_out = self.client().data_out(job_id.as_str(), &script, data_out_timeout).await;
        if !data_out.success {
            return self.force_teardown(job_id, "dws_data_out", &data_out.stderr).await;
        }

        let post_run_timeout = self.config().timeouts.for_function("post_run");
        let post_run = self.client().post_run(job_id.as_str(), &script, post_run_timeout).await;
        if !post_run.success {
            return self.force_teardown(job_id, "post_run", &post_run.stderr).await;
        }

        self.teardown_locked(job_id, false).await
    }

    /// `teardown → complete`, idempotent: a "token not found" stderr is
    /// treated as success.
    pub async fn teardown(&self, job_id: &bb_core::JobId, hurry: bool) -> Result<(), BbError> {
        let _job_lock = self.host().write_lock(job_id).await;
        self.teardown_locked(job_id, hurry).await
    }

    /// The body of `teardown`, without acquiring the job lock: used by
    /// callers that already hold it (`force_teardown`, `stage_out`'s final
    /// step) so the same task never tries to take the lock twice.
    async fn teardown_locked(&self, job_id: &bb_core::JobId, hurry: bool) -> Result<(), BbError> {
        self.transition(job_id, BufferState::Teardown);
        let dir = job_dir(&self.config().state_save_dir, job_id);
        let script = script_path(&dir);
        let timeout = self.config().timeouts.for_function("teardown");
        let out = self.client().teardown(job_id.as_str(), &script, hurry, timeout).await;

        if !out.success && !BbError::is_token_not_found(&out.stderr) {
            let now = self.clock().now_epoch_secs();
            self.lock_state_mut(|s| {
                if let Some(p) = s.plan_mut(job_id) {
                    p.state_reason = Some(FAIL_BURST_BUFFER_OP.to_string());
                    p.state_desc = Some(format!("teardown: {}", out.stderr));
                    p.state_entered_at = now;
                }
            });
            return Err(BbError::ExternalError { function: "teardown".to_string(), status: Some(out.status), stderr: out.stderr });
        }

        self.lock_state_mut(|s| {
            let user_id = s.plan(job_id).map(|p| p.user_id).unwrap_or(bb_core::UserId::new(0));
            s.remove_allocation(user_id, &AllocationKey::JobScratch(job_id.clone()));
        });
        self.transition(job_id, BufferState::Complete);
        Ok(())
    }

    /// Write the job's script to its on-disk artifact directory and run the
    /// submission-time `job_process`/`paths` pair, returning the
    /// environment variables `paths` reported for the host to inject into
    /// the job. Unlike the staging steps, these two calls are awaited
    /// inline rather than dispatched: their output is needed synchronously
    /// by the caller (`validate2`'s env-var injection), not polled later.
    pub async fn prepare_submission_artifacts(&self, job_id: &bb_core::JobId, script_body: &str) -> Result<Vec<(String, String)>, BbError> {
        let dir = job_dir(&self.config().state_save_dir, job_id);
        let script = script_path(&dir);
        self.snapshot_io
        .write(&script, script_body.as_bytes())
        .map_err(|e| BbError::SnapshotIo(e.to_string()))?;

        let timeout = self.config().timeouts.for_function("job_process");
        let out = self.client().job_process(&script, timeout).await;
        if !out.success {
            return Err(BbError::ExternalError { function: "job_process".to_string(), status: Some(out.status), stderr: out.stderr });
        }

        let pathfile = pathfile_path(&dir);
        let timeout = self.config().timeouts.for_function("paths");
        let out = self.client().paths(&script, job_id.as_str(), &pathfile, timeout).await;
        if !out.success {
            return Err(BbError::ExternalError { function: "paths".to_string(), status: Some(out.status), stderr: out.stderr });
        }
        Ok(out.stdout.lines().filter_map(|l| l.split_once('=')).map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    /// Dispatch `f` on a detached worker task spawned per step.
    pub fn dispatch_step<F>(self: &Arc<Self>, f: impl FnOnce(Arc<Self>) -> F + Send + 'static)
    where
    F: std::future::Future<Output = Result<(), BbError>> + Send + 'static,
    Self: Send + Sync + 'static,
    {
        let this = Arc::clone(self);
        crate::runtime::dispatch(async move {
            if let Err(e) = f(this).await {
                tracing::error!(error = %e, "burst-buffer step failed");
            }
        });
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
