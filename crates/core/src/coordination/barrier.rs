// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier state machine for group synchronization
//!
//! A barrier collects distinct agents until an expected count is reached, then
//! releases every arrived agent at once and starts a fresh cycle under the same
//! name.

use crate::clock::Clock;
use crate::effect::{AgentEvent, Effect, Event};
use crate::id::AgentId;
use std::time::Instant;

/// Observed result of a single barrier entry
///
/// Counts reflect the cycle as it stood when the entry was processed, even if
/// the same entry released and reset it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arrival {
    pub released: bool,
    pub arrived_count: usize,
    pub expected_count: usize,
}

/// A named barrier and its current cycle
#[derive(Clone, Debug)]
pub struct Barrier {
    pub name: String,
    /// Fixed by the first entrant of each cycle
    pub expected_count: usize,
    /// Completed cycles so far
    pub generation: u64,
    /// When the current cycle received its first entry
    pub opened_at: Option<Instant>,
    arrived: Vec<AgentId>,
}

/// Events that trigger barrier transitions
#[derive(Clone, Debug)]
pub enum BarrierInput {
    /// An agent reaches the barrier
    Enter {
        agent_id: AgentId,
        expected_count: usize,
    },
    /// Discard the accumulating cycle without releasing anyone
    Reset,
}

impl Barrier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_count: 0,
            generation: 0,
            opened_at: None,
            arrived: Vec::new(),
        }
    }

    /// No cycle in progress
    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty()
    }

    pub fn arrived_count(&self) -> usize {
        self.arrived.len()
    }

    pub fn has_arrived(&self, agent_id: &AgentId) -> bool {
        self.arrived.contains(agent_id)
    }

    /// Pure state transition function
    pub fn transition(
        &self,
        input: BarrierInput,
        clock: &impl Clock,
    ) -> (Barrier, Arrival, Vec<Effect>) {
        let mut new_barrier = self.clone();
        let mut effects = Vec::new();

        match input {
            BarrierInput::Enter {
                agent_id,
                expected_count,
            } => {
                if new_barrier.arrived.is_empty() {
                    new_barrier.expected_count = expected_count;
                    new_barrier.opened_at = Some(clock.now());
                }

                if !new_barrier.has_arrived(&agent_id) {
                    new_barrier.arrived.push(agent_id.clone());
                    effects.push(Effect::Emit(Event::BarrierArrived {
                        name: self.name.clone(),
                        agent: agent_id.0,
                        arrived: new_barrier.arrived.len(),
                        expected: new_barrier.expected_count,
                    }));
                }

                let arrival = Arrival {
                    released: new_barrier.arrived.len() >= new_barrier.expected_count,
                    arrived_count: new_barrier.arrived.len(),
                    expected_count: new_barrier.expected_count,
                };

                if arrival.released {
                    new_barrier.release(clock, &mut effects);
                }

                (new_barrier, arrival, effects)
            }

            BarrierInput::Reset => {
                let arrival = Arrival {
                    released: false,
                    arrived_count: self.arrived.len(),
                    expected_count: self.expected_count,
                };
                if !self.arrived.is_empty() {
                    effects.push(Effect::Emit(Event::BarrierReset {
                        name: self.name.clone(),
                        arrived: self.arrived.len(),
                    }));
                    new_barrier.arrived.clear();
                    new_barrier.opened_at = None;
                }
                (new_barrier, arrival, effects)
            }
        }
    }

    /// Notify every arrived agent and start the next cycle
    fn release(&mut self, clock: &impl Clock, effects: &mut Vec<Effect>) {
        let arrived = std::mem::take(&mut self.arrived);
        let timestamp = clock.utc_now();

        for agent_id in &arrived {
            effects.push(Effect::Notify {
                agent_id: agent_id.clone(),
                event: AgentEvent::BarrierRelease {
                    barrier_id: self.name.clone(),
                    arrived_count: arrived.len(),
                    timestamp,
                },
            });
        }
        effects.push(Effect::Emit(Event::BarrierReleased {
            name: self.name.clone(),
            arrived: arrived.len(),
            generation: self.generation,
        }));

        self.generation += 1;
        self.opened_at = None;
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
