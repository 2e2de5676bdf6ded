// SPDX-License-Identifier: MIT

//! The single owning object constructed once at plugin init: load
//! whatever durable state exists, hand back one object the host keeps for
//! the process lifetime.

use bb_adapters::{CommandRunner, DwWlmClient};
use bb_core::{BbConfig, BbError, Clock};
use bb_engine::{Host, Runtime};
use bb_storage::{SnapshotIo, StateStore};
use std::sync::Arc;

/// Constructed once by the host scheduler at plugin init and handed out as needed; every facade operation in
/// [`crate::facade`] is a method on this type.
pub struct BurstBufferPlugin<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> {
    pub(crate) runtime: Arc<Runtime<R, C, H, IO>>,
}

impl<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> Clone for BurstBufferPlugin<R, C, H, IO> {
    fn clone(&self) -> Self {
        Self { runtime: Arc::clone(&self.runtime) }
    }
}

impl<R: CommandRunner, C: Clock, H: Host, IO: SnapshotIo> BurstBufferPlugin<R, C, H, IO> {
    /// Load the snapshot (if any) and seed its records for re-attribution
    /// once the background agent's next sync pass rediscovers matching
    /// sessions. Recovery on startup reads the snapshot and re-attributes
    /// the account/partition/QoS fields onto allocations newly discovered
    /// from the external subsystem, matched by (name, user_id).
    pub fn new(client: DwWlmClient<R>, clock: C, host: H, config: BbConfig, snapshot_io: IO) -> Result<Self, BbError> {
        let records = bb_storage::load_snapshot(&snapshot_io, &config.state_save_dir, config.emulation_mode)?;
        let runtime = Arc::new(Runtime::new(client, clock, host, config, snapshot_io, StateStore::new()));
        runtime.seed_recovered(records);
        Ok(Self { runtime })
    }

    pub fn runtime(&self) -> &Arc<Runtime<R, C, H, IO>> {
        &self.runtime
    }

    /// Run the background synchronizer until `shutdown` fires.
    /// The host spawns this once alongside the plugin object; dropping the
    /// returned handle or flipping `shutdown` stops it.
    pub async fn run_background_agent(&self, shutdown: tokio::sync::watch::Receiver<bool>) {
        self.runtime().run_background_agent(shutdown).await;
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
