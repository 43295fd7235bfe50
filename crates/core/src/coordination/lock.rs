// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock state machine for exclusive resource access
//!
//! A lock has at most one holder and a FIFO wait queue. Holders are granted a
//! deadline; when it passes the lock is reclaimed and handed to the next waiter.

use crate::clock::Clock;
use crate::effect::{AgentEvent, Effect, Event};
use crate::id::AgentId;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Longest lease a single grant can carry
pub const MAX_LOCK_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lock state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockState {
    /// Lock is available
    Free,
    /// Lock is held by a holder
    Held {
        holder: AgentId,
        granted_at: Instant,
        expires_at: Instant,
        /// Timeout the current grant was computed from
        timeout: Duration,
    },
}

/// An agent queued for a held lock
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waiter {
    pub agent_id: AgentId,
    /// Timeout applied when this waiter is promoted
    pub timeout: Duration,
    pub enqueued_at: Instant,
}

/// A named lock with a FIFO wait queue
#[derive(Clone, Debug)]
pub struct Lock {
    pub name: String,
    pub state: LockState,
    waiters: VecDeque<Waiter>,
}

/// Events that can trigger lock transitions
#[derive(Clone, Debug)]
pub enum LockInput {
    /// Request the lock, queueing if it is held by someone else
    Acquire { agent_id: AgentId, timeout: Duration },
    /// Release the lock; ignored unless sent by the holder
    Release { agent_id: AgentId },
    /// The holder's expiration timer fired
    Expire { holder: AgentId },
    /// The agent went away: drop its grant and any queued request
    Abandon { agent_id: AgentId },
}

impl Lock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LockState::Free,
            waiters: VecDeque::new(),
        }
    }

    /// Check if the lock is currently free
    pub fn is_free(&self) -> bool {
        matches!(self.state, LockState::Free)
    }

    /// Free with nobody waiting; indistinguishable from a lock never requested
    pub fn is_idle(&self) -> bool {
        self.is_free() && self.waiters.is_empty()
    }

    /// Check if the lock is held by a specific agent
    pub fn is_held_by(&self, agent_id: &AgentId) -> bool {
        matches!(&self.state, LockState::Held { holder, .. } if holder == agent_id)
    }

    /// Get the current holder, if any
    pub fn holder(&self) -> Option<&AgentId> {
        match &self.state {
            LockState::Free => None,
            LockState::Held { holder, .. } => Some(holder),
        }
    }

    /// Deadline of the current grant, if held
    pub fn expires_at(&self) -> Option<Instant> {
        match &self.state {
            LockState::Free => None,
            LockState::Held { expires_at, .. } => Some(*expires_at),
        }
    }

    /// Queued agents, oldest first
    pub fn waiters(&self) -> impl Iterator<Item = &Waiter> {
        self.waiters.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.waiters.len()
    }

    /// 1-based position of an agent in the wait queue
    pub fn queue_position(&self, agent_id: &AgentId) -> Option<usize> {
        self.waiters
            .iter()
            .position(|w| &w.agent_id == agent_id)
            .map(|i| i + 1)
    }

    /// Check if the current grant has run past its deadline
    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        self.expires_at().is_some_and(|at| at <= clock.now())
    }

    /// Pure state transition function
    pub fn transition(&self, input: LockInput, clock: &impl Clock) -> (Lock, Vec<Effect>) {
        let mut new_lock = self.clone();
        let mut effects = Vec::new();

        match input {
            LockInput::Acquire { agent_id, timeout } => {
                // A deadline that passed before its timer was delivered is
                // reclaimed first so the queue keeps its order.
                if !self.is_held_by(&agent_id) && self.is_expired(clock) {
                    if let Some(holder) = self.holder().cloned() {
                        new_lock.vacate(&mut effects);
                        effects.push(Effect::Emit(Event::LockExpired {
                            name: self.name.clone(),
                            holder: holder.0,
                        }));
                        new_lock.promote(clock, &mut effects);
                    }
                }
                new_lock.acquire(agent_id, timeout, clock, &mut effects);
            }

            LockInput::Release { agent_id } => {
                if self.is_held_by(&agent_id) {
                    new_lock.vacate(&mut effects);
                    effects.push(Effect::Emit(Event::LockReleased {
                        name: self.name.clone(),
                        holder: agent_id.0,
                    }));
                    new_lock.promote(clock, &mut effects);
                }
            }

            LockInput::Expire { holder } => {
                // Stale timers (released or renewed grants) are no-ops
                if self.is_held_by(&holder) && self.is_expired(clock) {
                    new_lock.vacate(&mut effects);
                    effects.push(Effect::Emit(Event::LockExpired {
                        name: self.name.clone(),
                        holder: holder.0,
                    }));
                    new_lock.promote(clock, &mut effects);
                }
            }

            LockInput::Abandon { agent_id } => {
                let held = self.is_held_by(&agent_id);
                if held || self.queue_position(&agent_id).is_some() {
                    effects.push(Effect::Emit(Event::LockAbandoned {
                        name: self.name.clone(),
                        agent: agent_id.0.clone(),
                    }));
                    new_lock.waiters.retain(|w| w.agent_id != agent_id);
                    if held {
                        new_lock.vacate(&mut effects);
                        new_lock.promote(clock, &mut effects);
                    }
                }
            }
        }

        (new_lock, effects)
    }

    fn acquire(
        &mut self,
        agent_id: AgentId,
        timeout: Duration,
        clock: &impl Clock,
        effects: &mut Vec<Effect>,
    ) {
        match &self.state {
            LockState::Free => {
                self.grant(agent_id.clone(), timeout, clock, effects);
                effects.push(Effect::Emit(Event::LockAcquired {
                    name: self.name.clone(),
                    holder: agent_id.0,
                    promoted: false,
                }));
            }
            LockState::Held { holder, .. } if holder == &agent_id => {
                // Reentrant: the new timeout wins
                self.grant(agent_id.clone(), timeout, clock, effects);
                effects.push(Effect::Emit(Event::LockRenewed {
                    name: self.name.clone(),
                    holder: agent_id.0,
                }));
            }
            LockState::Held { .. } => {
                match self.waiters.iter_mut().find(|w| w.agent_id == agent_id) {
                    Some(waiter) => waiter.timeout = timeout,
                    None => self.waiters.push_back(Waiter {
                        agent_id: agent_id.clone(),
                        timeout,
                        enqueued_at: clock.now(),
                    }),
                }
                let position = self.queue_position(&agent_id).unwrap_or(self.waiters.len());
                effects.push(Effect::Emit(Event::LockQueued {
                    name: self.name.clone(),
                    agent: agent_id.0,
                    position,
                }));
            }
        }
    }

    /// Hand the lock to an agent and arm its expiration timer
    fn grant(
        &mut self,
        agent_id: AgentId,
        timeout: Duration,
        clock: &impl Clock,
        effects: &mut Vec<Effect>,
    ) {
        let now = clock.now();
        let timeout = timeout.min(MAX_LOCK_TIMEOUT);
        let expires_at = now.checked_add(timeout).unwrap_or(now);
        self.state = LockState::Held {
            holder: agent_id.clone(),
            granted_at: now,
            expires_at,
            timeout,
        };
        effects.push(Effect::ScheduleExpiry {
            lock_id: self.name.clone(),
            holder: agent_id,
            fire_at: expires_at,
        });
    }

    /// Clear the holder and disarm its timer
    fn vacate(&mut self, effects: &mut Vec<Effect>) {
        self.state = LockState::Free;
        effects.push(Effect::CancelExpiry {
            lock_id: self.name.clone(),
        });
    }

    /// Grant a free lock to the head of the wait queue, notifying it
    fn promote(&mut self, clock: &impl Clock, effects: &mut Vec<Effect>) {
        let Some(next) = self.waiters.pop_front() else {
            return;
        };

        self.grant(next.agent_id.clone(), next.timeout, clock, effects);
        let Some(expires_at) = self.expires_at() else {
            return;
        };
        effects.push(Effect::Notify {
            agent_id: next.agent_id.clone(),
            event: AgentEvent::LockGranted {
                lock_id: self.name.clone(),
                expires_at: clock.to_utc(expires_at),
            },
        });
        effects.push(Effect::Emit(Event::LockAcquired {
            name: self.name.clone(),
            holder: next.agent_id.0,
            promoted: true,
        }));
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
