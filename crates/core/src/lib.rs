// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bb-core: data model and trait seams for the burst-buffer orchestration
//! core.

pub mod allocation;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod id;
pub mod plan;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use allocation::{Allocation, AllocationKey, AssociationHandle, AssociationRef};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BbConfig, PreemptionPolicy, Timeouts};
pub use error::BbError;
pub use host::{HostJobInfo, HostJobLock, HostJobLockGuard, HostJobQuery, Reservation, ReservationSource};
pub use id::{JobId, UserId};
pub use plan::{round_up_to_granularity, BufferPlan, GresRequest, PersistentOp, PersistentOpKind};
pub use state::BufferState;
