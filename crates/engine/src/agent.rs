// SPDX-License-Identifier: MIT

//! The background agent: a single long-lived task that reconciles internal
//! bookkeeping with the external subsystem's reported pools, instances, and
//! sessions, enforces phase timeouts, and persists the limit snapshot.

use crate::runtime::{Host, Runtime};
use bb_adapters::CommandRunner;
use bb_core::{Allocation, AllocationKey, AssociationRef, BufferState, Clock};
use bb_storage::{GresState, PoolState, SnapshotIo, SnapshotRecord};
use std::time::Duration;

impl<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> Runtime<R, C, H, IO> {
    /// Run one sync pass (steps 1-5). Returns the number of
    /// allocations reclaimed, for observability.
    pub async fn sync_once(&self) -> usize {
        let now = self.clock().now_epoch_secs();
        let timeout = self.config().timeouts.for_function("show_pools");

        let pools = self.client().show_pools(timeout).await.unwrap_or_default();
        // `show_instances` is polled every pass to keep the sync cadence
        // consistent, but its per-instance byte counts are not consumed here;
        // tracking bytes per session is handled via the pool/gres tables below
        // instead.
        let _instances = self.client().show_instances(timeout).await.unwrap_or_default();
        let sessions = self.client().show_sessions(timeout).await.unwrap_or_default();

        // Step 2: default pool capacity + generic-resource table.
        self.lock_state_mut(|s| {
            if let Some(default_pool) = pools.first() {
                s.set_pool(PoolState {
                    granularity: if self.config().granularity > 0 { self.config().granularity } else { default_pool.granularity },
                    total: default_pool.quantity,
                    used: default_pool.quantity.saturating_sub(default_pool.free),
                });
            }
            // Every non-default pool gets its own generic-resource entry, keyed
            // by pool id, rather than clobbering a single shared one.
            for pool in pools.iter().skip(1) {
                s.set_gres(
                    pool.id.clone(),
                    GresState { avail: pool.quantity, used: pool.quantity.saturating_sub(pool.free), reserved: 0 },
                );
            }
        });

        // Step 3: reconcile sessions against known allocations.
        for session in &sessions {
            let owner = bb_core::UserId::new(session.user_id);
            self.lock_state_mut(|s| {
                let key = allocation_key_for_session(&session.token, owner);
                if let Some(a) = s.find_allocation_mut(owner, &key) {
                    a.last_seen = now;
                } else if let Some(rec) = s.take_recovered(&session.token, owner) {
                    // A snapshot record waiting since startup recovery,
                    // matched by (name, owner).
                    let job_id = self.config().emulation_mode.then(|| job_id_from_token(&rec.name)).flatten();
                    s.insert_allocation(Allocation {
                        owner,
                        job_id: job_id.clone(),
                        name: if job_id.is_some() { None } else { Some(rec.name.clone()) },
                        size: if self.config().emulation_mode { rec.size.unwrap_or(0) } else { 0 },
                        account: rec.account,
                        partition: rec.partition,
                        qos: rec.qos,
                        create_time: rec.create_time,
                        last_seen: now,
                        state: BufferState::Complete,
                        association: AssociationRef::new(session.token.clone()),
                        charged: true,
                    });
                } else {
                    let (account, partition, qos) = s
                    .allocations()
                    .find(|a| a.owner == owner)
                    .map(|a| (a.account.clone(), a.partition.clone(), a.qos.clone()))
                    .unwrap_or_default();
                    s.insert_allocation(Allocation {
                        owner,
                        job_id: job_id_from_token(&session.token),
                        name: name_from_token(&session.token),
                        size: 0,
                        account,
                        partition,
                        qos,
                        create_time: now,
                        last_seen: now,
                        state: BufferState::Complete,
                        association: AssociationRef::new(session.token.clone()),
                        charged: false,
                    });
                }
            });
        }

        // Step 4: reclaim vestigial allocations.
        let last_load_time = self.last_load_time();
        let known_jobs = self.host().known_job_ids();
        let reclaimed = self.lock_state_mut(|s| {
            let vanished: Vec<(AllocationKey, bb_core::UserId)> = s
            .allocations()
            .filter(|a| {
                a.last_seen < last_load_time
                || (a.state == BufferState::Complete
                    && a.job_id.as_ref().is_some_and(|j| !known_jobs.contains(j)))
            })
            .map(|a| (a.key(), a.owner))
            .collect();
            for (key, owner) in &vanished {
                s.remove_allocation(*owner, key);
            }
            vanished.len()
        });

        self.set_last_load_time(now);

        // Step 5: snapshot write-through if dirty.
        if self.take_dirty() {
            let records = self.lock_state(|s| {
                s.allocations()
                .filter(|a| a.is_persistent())
                .map(|a| SnapshotRecord {
                    account: a.account.clone(),
                    create_time: a.create_time,
                    name: a.name.clone().unwrap_or_default(),
                    partition: a.partition.clone(),
                    qos: a.qos.clone(),
                    user_id: a.owner.get(),
                    size: self.config().emulation_mode.then_some(a.size),
                })
                .collect::<Vec<_>>()
            });
            if let Err(e) = bb_storage::write_snapshot(&self.snapshot_io, &self.config().state_save_dir, &records, self.config().emulation_mode) {
                tracing::error!(error = %e, "snapshot write failed");
                self.mark_dirty();
            }
        }

        self.enforce_timeouts(now).await;
        reclaimed
    }

    /// Force-teardown any plan that has sat in a timed-out phase too long.
    /// Timeouts for stage-in/stage-out are enforced by recording
    /// state-entry timestamps.
    async fn enforce_timeouts(&self, now: u64) {
        let overdue: Vec<bb_core::JobId> = self.lock_state(|s| {
            s.plans()
            .filter(|p| {
                let budget = match p.state {
                    BufferState::StagingIn => self.config().timeouts.stage_in_secs,
                    BufferState::StagingOut => self.config().timeouts.stage_out_secs,
                    BufferState::Allocating => self.config().timeouts.setup_secs,
                    BufferState::Teardown => self.config().timeouts.teardown_secs,
                    _ => return false,
                };
                now.saturating_sub(p.state_entered_at) > budget
            })
            .map(|p| p.job_id.clone())
            .collect()
        });
        for job_id in overdue {
            tracing::warn!(job_id = %job_id, "burst-buffer phase timed out; forcing teardown");
            if let Err(e) = self.teardown(&job_id, true).await {
                tracing::error!(job_id = %job_id, error = %e, "forced teardown after timeout failed");
            }
        }
    }

    /// Loop `sync_once` at the configured interval until `shutdown` fires.
    /// A `tokio::select!` over the sleep and the shutdown watch channel
    /// supports prompt shutdown without waiting for the full interval.
    pub async fn run_background_agent(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config().sync_interval_secs.max(1));
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.sync_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

fn allocation_key_for_session(token: &str, owner: bb_core::UserId) -> AllocationKey {
    match job_id_from_token(token) {
        Some(job_id) => AllocationKey::JobScratch(job_id),
        None => AllocationKey::Persistent(owner, token.to_string()),
    }
}

/// A session token that parses as an integer is a job-scratch token (the
/// job id); otherwise it names a persistent buffer.
fn job_id_from_token(token: &str) -> Option<bb_core::JobId> {
    token.parse::<u64>().ok().map(|_| bb_core::JobId::from(token))
}

fn name_from_token(token: &str) -> Option<String> {
    if token.parse::<u64>().is_ok() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
