// SPDX-License-Identifier: MIT

//! In-memory state: a hash-bucketed allocation table, a plan table keyed
//! by job id, and per-(user,account,partition,qos) usage counters. This
//! is the data the engine's single state mutex guards.

use crate::record::SnapshotRecord;
use bb_core::{Allocation, AllocationKey, BufferPlan, JobId, UserId};
use std::collections::HashMap;

/// Number of hash buckets the allocation table chains into (`user_id mod H`).
pub const BUCKET_COUNT: u64 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub user_id: UserId,
    pub account: String,
    pub partition: String,
    pub qos: String,
}

/// The default pool's capacity, refreshed by the background agent from
/// `show_pools`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolState {
    pub granularity: u64,
    pub total: u64,
    pub used: u64,
}

/// A non-default pool's generic-resource capacity.
#[derive(Debug, Clone, Copy, Default)]
pub struct GresState {
    pub avail: u64,
    pub used: u64,
    pub reserved: u64,
}

#[derive(Debug, Default)]
pub struct StateStore {
    allocations: HashMap<u64, Vec<Allocation>>,
    plans: HashMap<JobId, BufferPlan>,
    usage: HashMap<UsageKey, u64>,
    pool: PoolState,
    gres: HashMap<String, GresState>,
    /// Snapshot records loaded at startup, keyed by (buffer name, owner),
    /// waiting to be re-attributed onto an allocation the agent discovers
    /// from the external subsystem's session table. Two different users may
    /// each own a persistent buffer with the same name, so name alone is not
    /// a unique key.
    recovered: HashMap<(String, UserId), SnapshotRecord>,
}

fn bucket_of(user_id: UserId) -> u64 {
    user_id.get() as u64 % BUCKET_COUNT
}

fn usage_key_of(alloc: &Allocation) -> UsageKey {
    UsageKey {
        user_id: alloc.owner,
        account: alloc.account.clone(),
        partition: alloc.partition.clone(),
        qos: alloc.qos.clone(),
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_allocation(&mut self, alloc: Allocation) {
        if alloc.charged {
            self.add_usage(usage_key_of(&alloc), alloc.size);
        }
        self.allocations.entry(bucket_of(alloc.owner)).or_default().push(alloc);
    }

    pub fn find_allocation(&self, owner: UserId, key: &AllocationKey) -> Option<&Allocation> {
        self.allocations.get(&bucket_of(owner))?.iter().find(|a| &a.key() == key)
    }

    pub fn find_allocation_mut(&mut self, owner: UserId, key: &AllocationKey) -> Option<&mut Allocation> {
        self.allocations.get_mut(&bucket_of(owner))?.iter_mut().find(|a| &a.key() == key)
    }

    pub fn remove_allocation(&mut self, owner: UserId, key: &AllocationKey) -> Option<Allocation> {
        let bucket = self.allocations.get_mut(&bucket_of(owner))?;
        let idx = bucket.iter().position(|a| &a.key() == key)?;
        let removed = bucket.remove(idx);
        if removed.charged {
            self.sub_usage(&usage_key_of(&removed), removed.size);
        }
        Some(removed)
    }

    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.values().flatten()
    }

    pub fn upsert_plan(&mut self, plan: BufferPlan) {
        self.plans.insert(plan.job_id.clone(), plan);
    }

    pub fn plan(&self, job_id: &JobId) -> Option<&BufferPlan> {
        self.plans.get(job_id)
    }

    pub fn plan_mut(&mut self, job_id: &JobId) -> Option<&mut BufferPlan> {
        self.plans.get_mut(job_id)
    }

    pub fn remove_plan(&mut self, job_id: &JobId) -> Option<BufferPlan> {
        self.plans.remove(job_id)
    }

    pub fn plans(&self) -> impl Iterator<Item = &BufferPlan> {
        self.plans.values()
    }

    pub fn add_usage(&mut self, key: UsageKey, delta: u64) {
        *self.usage.entry(key).or_insert(0) += delta;
    }

    pub fn sub_usage(&mut self, key: &UsageKey, delta: u64) {
        if let Some(v) = self.usage.get_mut(key) {
            *v = v.saturating_sub(delta);
        }
    }

    pub fn usage(&self, key: &UsageKey) -> u64 {
        self.usage.get(key).copied().unwrap_or(0)
    }

    /// Sum of every usage bucket charged to `user_id`, across all of its
    /// account/partition/qos combinations.
    pub fn usage_for_user(&self, user_id: UserId) -> u64 {
        self.usage.iter().filter(|(k, _)| k.user_id == user_id).map(|(_, v)| *v).sum()
    }

    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    pub fn set_pool(&mut self, pool: PoolState) {
        self.pool = pool;
    }

    pub fn gres(&self, name: &str) -> GresState {
        self.gres.get(name).copied().unwrap_or_default()
    }

    pub fn set_gres(&mut self, name: impl Into<String>, state: GresState) {
        self.gres.insert(name.into(), state);
    }

    pub fn gres_names(&self) -> impl Iterator<Item = &String> {
        self.gres.keys()
    }

    /// Stash snapshot records loaded at startup, to be claimed by
    /// (name, owner) as the agent's sync pass discovers matching sessions.
    pub fn seed_recovered(&mut self, records: Vec<SnapshotRecord>) {
        for record in records {
            self.recovered.insert((record.name.clone(), UserId::new(record.user_id)), record);
        }
    }

    /// Claim a recovered record by (buffer name, owner), if one is still
    /// waiting.
    pub fn take_recovered(&mut self, name: &str, owner: UserId) -> Option<SnapshotRecord> {
        self.recovered.remove(&(name.to_string(), owner))
    }
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;
