// SPDX-License-Identifier: MIT

//! Clock abstraction so timeouts and timestamps are testable without sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, in epoch seconds.
///
/// The planner, the background agent's timeout checks, and the snapshot's
/// `create_time`/`last_seen` fields all go through this trait instead of
/// calling `SystemTime::now()` directly, so tests can pin time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_epoch_secs(&self) -> u64;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> u64 {
        SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
    }
}

/// Deterministic clock for tests; starts at an arbitrary fixed instant and
/// only advances when told to.
#[derive(Debug, Clone)]
pub struct FakeClock {
    secs: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_epoch_secs: u64) -> Self {
        Self {
            secs: Arc::new(Mutex::new(start_epoch_secs)),
        }
    }

    pub fn advance(&self, delta_secs: u64) {
        *self.secs.lock() += delta_secs;
    }

    pub fn set(&self, epoch_secs: u64) {
        *self.secs.lock() = epoch_secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl Clock for FakeClock {
    fn now_epoch_secs(&self) -> u64 {
        *self.secs.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
