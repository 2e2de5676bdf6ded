// SPDX-License-Identifier: MIT

//! Test doubles for the host-side trait seams, available to every crate in
//! the workspace under the `test-support` feature.

use crate::host::{HostJobInfo, HostJobLock, HostJobLockGuard, HostJobQuery, Reservation, ReservationSource};
use crate::id::JobId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory host job table + reservation table, driven entirely by the
/// test, standing in for the real host scheduler.
#[derive(Clone, Default)]
pub struct FakeHost {
    jobs: Arc<Mutex<HashMap<String, HostJobInfo>>>,
    held: Arc<Mutex<Vec<(JobId, String)>>>,
    reservations: Arc<Mutex<Vec<Reservation>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, info: HostJobInfo) {
        self.jobs.lock().insert(info.job_id.as_str().to_string(), info);
    }

    pub fn remove_job(&self, job_id: &JobId) {
        self.jobs.lock().remove(job_id.as_str());
    }

    pub fn set_reservations(&self, reservations: Vec<Reservation>) {
        *self.reservations.lock() = reservations;
    }

    pub fn held_jobs(&self) -> Vec<(JobId, String)> {
        self.held.lock().clone()
    }
}

impl HostJobQuery for FakeHost {
    fn job_info(&self, job_id: &JobId) -> Option<HostJobInfo> {
        self.jobs.lock().get(job_id.as_str()).cloned()
    }

    fn known_job_ids(&self) -> Vec<JobId> {
        self.jobs.lock().keys().map(|k| JobId::new(k.clone())).collect()
    }

    fn hold_job(&self, job_id: &JobId, reason: &str) {
        self.held.lock().push((job_id.clone(), reason.to_string()));
        if let Some(job) = self.jobs.lock().get_mut(job_id.as_str()) {
            job.priority = 0;
        }
    }
}

impl ReservationSource for FakeHost {
    fn reservations(&self) -> Vec<Reservation> {
        self.reservations.lock().clone()
    }
}

/// A no-op lock guard for tests; the fake lock never contends.
pub struct FakeLockGuard;
impl HostJobLockGuard for FakeLockGuard {}

#[async_trait]
impl HostJobLock for FakeHost {
    async fn write_lock(&self, _job_id: &JobId) -> Box<dyn HostJobLockGuard> {
        Box::new(FakeLockGuard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::UserId;

    #[test]
    fn fake_host_holds_job_and_zeros_priority() {
        let host = FakeHost::new();
        host.insert_job(HostJobInfo {
            job_id: JobId::new("1"),
            user_id: UserId::new(10),
            account: "a".into(),
            partition: "p".into(),
            qos: "normal".into(),
            node_count: 1,
            priority: 500,
            start_time: 0,
        });
        host.hold_job(&JobId::new("1"), "destroy refused");
        assert_eq!(host.job_info(&JobId::new("1")).unwrap().priority, 0);
        assert_eq!(host.held_jobs(), vec![(JobId::new("1"), "destroy refused".to_string())]);
    }
}
