// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use crate::id::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Effects are side effects that state machines request
///
/// State machines never perform I/O; the coordinator executes these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit an event for other components to observe
    Emit(Event),
    /// Push an event to a single agent
    Notify { agent_id: AgentId, event: AgentEvent },
    /// Arm (or re-arm) the expiration timer of a lock
    ScheduleExpiry {
        lock_id: String,
        holder: AgentId,
        fire_at: Instant,
    },
    /// Disarm the expiration timer of a lock
    CancelExpiry { lock_id: String },
}

/// Event pushed to an agent over its connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A queued acquire has been granted
    LockGranted {
        lock_id: String,
        expires_at: DateTime<Utc>,
    },
    /// A barrier the agent entered has been released
    BarrierRelease {
        barrier_id: String,
        arrived_count: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Events emitted by state machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Lock events
    LockAcquired {
        name: String,
        holder: String,
        /// True when the grant came from the wait queue
        promoted: bool,
    },
    LockRenewed {
        name: String,
        holder: String,
    },
    LockQueued {
        name: String,
        agent: String,
        position: usize,
    },
    LockReleased {
        name: String,
        holder: String,
    },
    LockExpired {
        name: String,
        holder: String,
    },
    LockAbandoned {
        name: String,
        agent: String,
    },

    // Barrier events
    BarrierArrived {
        name: String,
        agent: String,
        arrived: usize,
        expected: usize,
    },
    BarrierReleased {
        name: String,
        arrived: usize,
        generation: u64,
    },
    BarrierReset {
        name: String,
        arrived: usize,
    },
}

impl Event {
    /// Get the event name for pattern matching
    pub fn name(&self) -> String {
        match self {
            // Lock events
            Event::LockAcquired { .. } => "lock:acquired".to_string(),
            Event::LockRenewed { .. } => "lock:renewed".to_string(),
            Event::LockQueued { .. } => "lock:queued".to_string(),
            Event::LockReleased { .. } => "lock:released".to_string(),
            Event::LockExpired { .. } => "lock:expired".to_string(),
            Event::LockAbandoned { .. } => "lock:abandoned".to_string(),

            // Barrier events
            Event::BarrierArrived { .. } => "barrier:arrived".to_string(),
            Event::BarrierReleased { .. } => "barrier:released".to_string(),
            Event::BarrierReset { .. } => "barrier:reset".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
