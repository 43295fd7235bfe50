// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managers owning the named locks and barriers
//!
//! Each manager is the single owner of its map. Entries are created on first
//! use; operations return effects for the coordinator to execute.

use super::barrier::{Arrival, Barrier, BarrierInput};
use super::lock::{Lock, LockInput};
use crate::clock::Clock;
use crate::effect::Effect;
use crate::id::AgentId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Result of an acquire request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquireOutcome {
    pub granted: bool,
    /// Deadline of the grant, present when granted
    pub expires_at: Option<Instant>,
    /// 0 when granted, otherwise the 1-based position in the wait queue
    pub queue_position: usize,
}

/// Why a release was refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseError {
    NotHolder,
}

impl std::fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseError::NotHolder => write!(f, "not holder"),
        }
    }
}

/// Result of a release request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub released: bool,
    pub error: Option<ReleaseError>,
}

/// Owns every named lock
#[derive(Clone, Debug, Default)]
pub struct LockManager {
    locks: HashMap<String, Lock>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a lock by name
    pub fn get_lock(&self, name: &str) -> Option<&Lock> {
        self.locks.get(name)
    }

    /// Request a lock, creating it on first use
    pub fn acquire(
        &mut self,
        name: &str,
        agent_id: AgentId,
        timeout: Duration,
        clock: &impl Clock,
    ) -> (AcquireOutcome, Vec<Effect>) {
        let lock = match self.locks.get(name) {
            Some(l) => l.clone(),
            None => Lock::new(name),
        };

        let (new_lock, effects) = lock.transition(
            LockInput::Acquire {
                agent_id: agent_id.clone(),
                timeout,
            },
            clock,
        );

        let outcome = if new_lock.is_held_by(&agent_id) {
            AcquireOutcome {
                granted: true,
                expires_at: new_lock.expires_at(),
                queue_position: 0,
            }
        } else {
            AcquireOutcome {
                granted: false,
                expires_at: None,
                queue_position: new_lock.queue_position(&agent_id).unwrap_or(0),
            }
        };

        self.locks.insert(name.to_string(), new_lock);
        (outcome, effects)
    }

    /// Release a lock held by `agent_id`
    ///
    /// Unknown and idle locks are refused the same way as a lock held by
    /// someone else, and are not created.
    pub fn release(
        &mut self,
        name: &str,
        agent_id: AgentId,
        clock: &impl Clock,
    ) -> (ReleaseOutcome, Vec<Effect>) {
        let refused = ReleaseOutcome {
            released: false,
            error: Some(ReleaseError::NotHolder),
        };

        let Some(lock) = self.locks.get(name).cloned() else {
            return (refused, vec![]);
        };
        if !lock.is_held_by(&agent_id) {
            return (refused, vec![]);
        }

        let (new_lock, effects) = lock.transition(LockInput::Release { agent_id }, clock);
        self.locks.insert(name.to_string(), new_lock);

        (
            ReleaseOutcome {
                released: true,
                error: None,
            },
            effects,
        )
    }

    /// Handle a fired expiration timer
    pub fn expire(&mut self, name: &str, holder: AgentId, clock: &impl Clock) -> Vec<Effect> {
        let Some(lock) = self.locks.get(name).cloned() else {
            return vec![];
        };

        let (new_lock, effects) = lock.transition(LockInput::Expire { holder }, clock);
        self.locks.insert(name.to_string(), new_lock);
        effects
    }

    /// Drop every grant and queued request of an agent
    pub fn abandon(&mut self, agent_id: &AgentId, clock: &impl Clock) -> Vec<Effect> {
        let mut effects = Vec::new();

        let mut names: Vec<_> = self.locks.keys().cloned().collect();
        names.sort();
        for name in names {
            if let Some(lock) = self.locks.get(&name).cloned() {
                let (new_lock, lock_effects) = lock.transition(
                    LockInput::Abandon {
                        agent_id: agent_id.clone(),
                    },
                    clock,
                );
                self.locks.insert(name, new_lock);
                effects.extend(lock_effects);
            }
        }

        effects
    }

    /// Remove idle locks; returns how many were removed
    pub fn prune_idle(&mut self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| !lock.is_idle());
        before - self.locks.len()
    }

    /// Get all lock names
    pub fn lock_names(&self) -> Vec<String> {
        self.locks.keys().cloned().collect()
    }

    pub fn locks(&self) -> impl Iterator<Item = &Lock> {
        self.locks.values()
    }
}

/// Owns every named barrier
#[derive(Clone, Debug, Default)]
pub struct BarrierManager {
    barriers: HashMap<String, Barrier>,
}

impl BarrierManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a barrier by name
    pub fn get_barrier(&self, name: &str) -> Option<&Barrier> {
        self.barriers.get(name)
    }

    /// Enter a barrier, creating it on first use
    pub fn enter(
        &mut self,
        name: &str,
        agent_id: AgentId,
        expected_count: usize,
        clock: &impl Clock,
    ) -> (Arrival, Vec<Effect>) {
        let barrier = match self.barriers.get(name) {
            Some(b) => b.clone(),
            None => Barrier::new(name),
        };

        let (new_barrier, arrival, effects) = barrier.transition(
            BarrierInput::Enter {
                agent_id,
                expected_count,
            },
            clock,
        );

        self.barriers.insert(name.to_string(), new_barrier);
        (arrival, effects)
    }

    /// Discard a barrier's accumulating cycle
    pub fn reset(&mut self, name: &str, clock: &impl Clock) -> Vec<Effect> {
        let Some(barrier) = self.barriers.get(name).cloned() else {
            return vec![];
        };

        let (new_barrier, _, effects) = barrier.transition(BarrierInput::Reset, clock);
        self.barriers.insert(name.to_string(), new_barrier);
        effects
    }

    /// Names of barriers whose current cycle opened at or before `cutoff`
    pub fn opened_before(&self, cutoff: Instant) -> Vec<String> {
        let mut names: Vec<_> = self
            .barriers
            .values()
            .filter(|b| b.opened_at.is_some_and(|at| at <= cutoff))
            .map(|b| b.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Remove barriers with no cycle in progress; returns how many were removed
    pub fn prune_idle(&mut self) -> usize {
        let before = self.barriers.len();
        self.barriers.retain(|_, barrier| !barrier.is_empty());
        before - self.barriers.len()
    }

    /// Get all barrier names
    pub fn barrier_names(&self) -> Vec<String> {
        self.barriers.keys().cloned().collect()
    }

    pub fn barriers(&self) -> impl Iterator<Item = &Barrier> {
        self.barriers.values()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
