// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! a2a-core: Coordination primitives for the agent router
//!
//! This crate provides:
//! - Pure state machines for locks and barriers
//! - Managers owning the named primitives
//! - Effects describing the I/O a transition needs
//! - Clock and id abstractions for deterministic tests

pub mod clock;
pub mod coordination;
pub mod effect;
pub mod id;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use coordination::{
    AcquireOutcome, Arrival, BarrierManager, CoordinationStats, LockManager, MaintenanceConfig,
    MaintenanceTask, ReleaseError, ReleaseOutcome, MAX_LOCK_TIMEOUT,
};
pub use effect::{AgentEvent, Effect, Event};
pub use id::{AgentId, ConnectionId, IdGen, UuidIdGen};
