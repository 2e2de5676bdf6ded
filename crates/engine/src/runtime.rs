// SPDX-License-Identifier: MIT

//! The engine's single owning object, instantiated once at plugin init.
//!
//! Wraps one [`StateStore`] behind one `parking_lot::Mutex` — there is
//! exactly one internal mutex guarding the in-memory allocation and plan
//! tables and the usage counters — and exposes `lock_state`/
//! `lock_state_mut` the way the host scheduler's own state-mutex helpers do.

use bb_adapters::{CommandRunner, DwWlmClient};
use bb_core::{BbConfig, Clock, HostJobLock, HostJobQuery, ReservationSource};
use bb_storage::{SnapshotIo, StateStore};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

/// Everything the host scheduler supplies about itself: job queries, the
/// per-job write lock, and the reservation table. These are the host's
/// external collaborators, kept behind the trait seams in `bb_core::host`.
pub trait Host: HostJobQuery + HostJobLock + ReservationSource + Clone + 'static {}
impl<T: HostJobQuery + HostJobLock + ReservationSource + Clone + 'static> Host for T {}

pub struct Runtime<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> {
    pub(crate) client: DwWlmClient<R>,
    pub(crate) clock: C,
    pub(crate) host: H,
    pub(crate) config: BbConfig,
    pub(crate) snapshot_io: IO,
    state: Arc<Mutex<StateStore>>,
    /// Epoch seconds of the agent's previous sync pass; allocations not
    /// seen since are vestigial.
    last_load_time: Mutex<u64>,
    /// Set whenever a persistent create lands since the last snapshot write;
    /// rewritten by the agent whenever a persistent create occurred after
    /// the last save.
    dirty_since_snapshot: Mutex<bool>,
}

impl<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> Runtime<R, C, H, IO> {
    pub fn new(client: DwWlmClient<R>, clock: C, host: H, config: BbConfig, snapshot_io: IO, state: StateStore) -> Self {
        Self {
            client,
            clock,
            host,
            config,
            snapshot_io,
            state: Arc::new(Mutex::new(state)),
            last_load_time: Mutex::new(0),
            dirty_since_snapshot: Mutex::new(false),
        }
    }

    pub fn lock_state<T>(&self, f: impl FnOnce(&StateStore) -> T) -> T {
        f(&self.state.lock())
    }

    pub fn lock_state_mut<T>(&self, f: impl FnOnce(&mut StateStore) -> T) -> T {
        f(&mut self.state.lock())
    }

    /// Seed the recovery table from a just-loaded snapshot;
    /// records are claimed by name as the agent's next sync pass discovers
    /// matching sessions.
    pub fn seed_recovered(&self, records: Vec<bb_storage::SnapshotRecord>) {
        self.lock_state_mut(|s| s.seed_recovered(records));
    }

    pub fn client(&self) -> &DwWlmClient<R> {
        &self.client
    }

    pub fn config(&self) -> &BbConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub(crate) fn last_load_time(&self) -> u64 {
        *self.last_load_time.lock()
    }

    pub(crate) fn set_last_load_time(&self, t: u64) {
        *self.last_load_time.lock() = t;
    }

    pub(crate) fn mark_dirty(&self) {
        *self.dirty_since_snapshot.lock() = true;
    }

    /// Returns whether the snapshot needs rewriting, and clears the flag.
    pub(crate) fn take_dirty(&self) -> bool {
        std::mem::take(&mut *self.dirty_since_snapshot.lock())
    }
}

/// Run `fut` on a detached worker task so external-command calls stay off
/// the host's calling thread. If no Tokio runtime is reachable from the
/// calling thread, fall back to running it to completion inline on a
/// throwaway runtime; this degrades to synchronous execution while
/// holding no locks.
pub fn dispatch<F>(fut: F)
where
F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => {
            tracing::warn!("no reachable tokio runtime; running burst-buffer step inline");
            match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(fut),
                Err(e) => tracing::error!(error = %e, "inline fallback runtime failed to start"),
            }
        }
    }
}
