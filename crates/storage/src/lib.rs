// SPDX-License-Identifier: MIT
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bb-storage: the in-memory allocation/plan tables and the durable
//! snapshot.

pub mod binary;
pub mod record;
pub mod snapshot_io;
pub mod tables;

pub use binary::{decode_snapshot, encode_snapshot, CURRENT_SNAPSHOT_VERSION};
pub use record::SnapshotRecord;
pub use snapshot_io::{load_snapshot, write_snapshot, FsSnapshotIo, SnapshotIo};
pub use tables::{GresState, PoolState, StateStore, UsageKey, BUCKET_COUNT};

#[cfg(any(test, feature = "test-support"))]
pub mod fake_io;
#[cfg(any(test, feature = "test-support"))]
pub use fake_io::FakeSnapshotIo;
