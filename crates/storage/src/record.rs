// SPDX-License-Identifier: MIT

//! The on-disk snapshot record: `{account, create_time, name, partition,
//! qos, user_id, (size if emulation)}`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub account: String,
    pub create_time: u64,
    pub name: String,
    pub partition: String,
    pub qos: String,
    pub user_id: u32,
    /// Present only when the snapshot was written in emulation mode.
    pub size: Option<u64>,
}
