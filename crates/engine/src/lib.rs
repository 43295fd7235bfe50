// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Agent coordination engine
//!
//! Wraps the lock and barrier state machines behind a validating façade and
//! drives lock expiration from a timer queue.

mod api;
mod coordinator;
mod error;
mod scheduler;

pub use api::{
    AcquireLockRequest, AcquireLockResponse, BarrierEnterRequest, BarrierEnterResponse,
    ReleaseLockRequest, ReleaseLockResponse,
};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use error::{CoordinationError, ErrorCode};
pub use scheduler::{ScheduledItem, ScheduledKind, Scheduler};
