// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use proptest::prelude::*;
use yare::parameterized;

fn enter(barrier: &Barrier, id: &str, expected: usize, clock: &FakeClock) -> (Barrier, Arrival, Vec<Effect>) {
    barrier.transition(
        BarrierInput::Enter {
            agent_id: AgentId::new(id),
            expected_count: expected,
        },
        clock,
    )
}

fn released_agents(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify {
                agent_id,
                event: AgentEvent::BarrierRelease { .. },
            } => Some(agent_id.0.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn new_barrier_is_empty() {
    let barrier = Barrier::new("barrier-Y");
    assert!(barrier.is_empty());
    assert_eq!(barrier.generation, 0);
}

#[test]
fn first_entry_accumulates() {
    let clock = FakeClock::new();
    let (barrier, arrival, effects) = enter(&Barrier::new("barrier-Y"), "a1", 2, &clock);

    assert_eq!(
        arrival,
        Arrival {
            released: false,
            arrived_count: 1,
            expected_count: 2,
        }
    );
    assert!(barrier.has_arrived(&AgentId::new("a1")));
    assert_eq!(barrier.opened_at, Some(clock.now()));
    assert!(released_agents(&effects).is_empty());
}

#[test]
fn final_entry_releases_every_arrived_agent() {
    let clock = FakeClock::new();
    let (barrier, _, _) = enter(&Barrier::new("barrier-Y"), "a1", 2, &clock);
    let (barrier, arrival, effects) = enter(&barrier, "a2", 2, &clock);

    assert!(arrival.released);
    assert_eq!(arrival.arrived_count, 2);
    assert_eq!(arrival.expected_count, 2);
    assert_eq!(released_agents(&effects), vec!["a1", "a2"]);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Emit(Event::BarrierReleased { arrived: 2, generation: 0, .. })
    )));

    // Cycle reset for reuse
    assert!(barrier.is_empty());
    assert_eq!(barrier.generation, 1);
}

#[test]
fn repeated_entry_counts_once() {
    let clock = FakeClock::new();
    let (barrier, _, _) = enter(&Barrier::new("barrier-Y"), "a1", 3, &clock);
    let (barrier, arrival, effects) = enter(&barrier, "a1", 3, &clock);

    assert_eq!(arrival.arrived_count, 1);
    assert!(!arrival.released);
    assert!(effects.is_empty());
    assert_eq!(barrier.arrived_count(), 1);
}

#[test]
fn first_entrant_fixes_expected_count() {
    let clock = FakeClock::new();
    let (barrier, _, _) = enter(&Barrier::new("barrier-Y"), "a1", 3, &clock);
    let (barrier, arrival, _) = enter(&barrier, "a2", 2, &clock);

    assert!(!arrival.released);
    assert_eq!(arrival.expected_count, 3);

    let (_, arrival, _) = enter(&barrier, "a3", 5, &clock);
    assert!(arrival.released);
    assert_eq!(arrival.arrived_count, 3);
}

#[test]
fn next_cycle_starts_from_zero_with_new_expected_count() {
    let clock = FakeClock::new();
    let (barrier, _, _) = enter(&Barrier::new("barrier-Y"), "a1", 2, &clock);
    let (barrier, _, _) = enter(&barrier, "a2", 2, &clock);
    let (barrier, arrival, _) = enter(&barrier, "a1", 3, &clock);

    assert_eq!(arrival.arrived_count, 1);
    assert_eq!(arrival.expected_count, 3);
    assert!(!arrival.released);
    assert_eq!(barrier.generation, 1);
}

#[parameterized(
    single = { 1 },
    pair = { 2 },
    five = { 5 },
)]
fn releases_exactly_at_expected_count(expected: usize) {
    let clock = FakeClock::new();
    let mut barrier = Barrier::new("barrier-N");

    for i in 1..=expected {
        let (next, arrival, effects) = enter(&barrier, &format!("a{}", i), expected, &clock);
        barrier = next;
        assert_eq!(arrival.arrived_count, i);
        assert_eq!(arrival.released, i == expected);
        assert_eq!(released_agents(&effects).len(), if i == expected { expected } else { 0 });
    }
}

#[test]
fn reset_discards_cycle_without_notifying() {
    let clock = FakeClock::new();
    let (barrier, _, _) = enter(&Barrier::new("barrier-Y"), "a1", 3, &clock);
    let (barrier, _, effects) = barrier.transition(BarrierInput::Reset, &clock);

    assert!(barrier.is_empty());
    assert!(barrier.opened_at.is_none());
    assert!(released_agents(&effects).is_empty());
    assert!(matches!(&effects[0], Effect::Emit(Event::BarrierReset { arrived: 1, .. })));
}

#[test]
fn reset_on_empty_barrier_is_noop() {
    let clock = FakeClock::new();
    let (_, _, effects) = Barrier::new("barrier-Y").transition(BarrierInput::Reset, &clock);
    assert!(effects.is_empty());
}

proptest! {
    #[test]
    fn arrivals_never_exceed_expected(ids in proptest::collection::vec(0u8..6, 0..40), expected in 1usize..5) {
        let clock = FakeClock::new();
        let mut barrier = Barrier::new("prop");
        let mut releases = 0usize;

        for id in ids {
            let (next, arrival, effects) = enter(&barrier, &format!("a{}", id), expected, &clock);
            barrier = next;
            prop_assert!(arrival.arrived_count <= arrival.expected_count);
            prop_assert!(barrier.arrived_count() < barrier.expected_count.max(1));
            if arrival.released {
                releases += 1;
                prop_assert_eq!(released_agents(&effects).len(), arrival.arrived_count);
            }
        }

        prop_assert_eq!(barrier.generation, releases as u64);
    }
}
