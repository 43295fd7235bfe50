// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives for agent synchronization
//!
//! This module provides:
//! - **Lock** - Exclusive access with a FIFO wait queue and expiring grants
//! - **Barrier** - Releases a group of agents once enough have arrived
//! - **LockManager / BarrierManager** - Owners of the named primitives
//! - **MaintenanceTask** - Idle pruning and the optional barrier watchdog

pub mod barrier;
pub mod lock;
pub mod maintenance;
pub mod manager;

pub use barrier::{Arrival, Barrier, BarrierInput};
pub use lock::{Lock, LockInput, LockState, Waiter, MAX_LOCK_TIMEOUT};
pub use maintenance::{CoordinationStats, MaintenanceConfig, MaintenanceTask};
pub use manager::{AcquireOutcome, BarrierManager, LockManager, ReleaseError, ReleaseOutcome};
