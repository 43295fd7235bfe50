// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::ErrorCode;
use a2a_adapters::{FakeNotifyAdapter, FakeSessionResolver};
use a2a_core::{AgentEvent, FakeClock, MaintenanceConfig};
use yare::parameterized;

type TestCoordinator = Coordinator<FakeNotifyAdapter, FakeSessionResolver, FakeClock>;

struct Harness {
    coordinator: TestCoordinator,
    notifier: FakeNotifyAdapter,
    sessions: FakeSessionResolver,
    clock: FakeClock,
}

fn setup_with(config: CoordinatorConfig) -> Harness {
    let notifier = FakeNotifyAdapter::new();
    let sessions = FakeSessionResolver::new();
    let clock = FakeClock::new();
    let coordinator = Coordinator::new(config, notifier.clone(), sessions.clone(), clock.clone());
    Harness {
        coordinator,
        notifier,
        sessions,
        clock,
    }
}

fn setup() -> Harness {
    setup_with(CoordinatorConfig::default())
}

fn conn() -> ConnectionId {
    ConnectionId::new("conn-1")
}

impl Harness {
    async fn acquire(&mut self, lock: &str, agent: &str, timeout: f64) -> AcquireLockResponse {
        self.coordinator
            .acquire_lock(
                &conn(),
                AcquireLockRequest::new(lock)
                    .with_agent(agent)
                    .with_timeout(timeout),
            )
            .await
            .unwrap()
    }

    async fn release(&mut self, lock: &str, agent: &str) -> ReleaseLockResponse {
        self.coordinator
            .release_lock(&conn(), ReleaseLockRequest::new(lock).with_agent(agent))
            .await
            .unwrap()
    }

    async fn enter(&mut self, barrier: &str, agent: &str, expected: u64) -> BarrierEnterResponse {
        self.coordinator
            .barrier_enter(
                &conn(),
                BarrierEnterRequest::new(barrier)
                    .with_agent(agent)
                    .with_expected_count(expected),
            )
            .await
            .unwrap()
    }

    fn holder(&self, lock: &str) -> Option<String> {
        self.coordinator
            .locks()
            .get_lock(lock)
            .and_then(|l| l.holder())
            .map(|a| a.to_string())
    }
}

#[tokio::test]
async fn queued_agent_is_granted_on_release() {
    let mut h = setup();

    let a = h.acquire("lock-X", "A", 30.0).await;
    assert!(a.granted);
    assert_eq!(a.queue_position, 0);
    assert_eq!(
        a.expires_at,
        Some(h.clock.utc_now() + chrono::Duration::seconds(30))
    );

    let b = h.acquire("lock-X", "B", 30.0).await;
    assert!(!b.granted);
    assert_eq!(b.queue_position, 1);
    assert_eq!(b.expires_at, None);

    let released = h.release("lock-X", "A").await;
    assert!(released.released);
    assert_eq!(released.error, None);

    assert_eq!(h.holder("lock-X").as_deref(), Some("B"));
    let events = h.notifier.events_for("B");
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        AgentEvent::LockGranted { lock_id, .. } if lock_id == "lock-X"
    ));
    assert!(h.notifier.events_for("A").is_empty());
}

#[tokio::test]
async fn barrier_releases_all_arrivals() {
    let mut h = setup();

    let first = h.enter("barrier-Y", "A", 2).await;
    assert!(!first.released);
    assert_eq!(first.arrived_count, 1);
    assert_eq!(first.expected_count, 2);
    assert!(h.notifier.calls().is_empty());

    let second = h.enter("barrier-Y", "B", 2).await;
    assert!(second.released);
    assert_eq!(second.arrived_count, 2);

    for agent in ["A", "B"] {
        let events = h.notifier.events_for(agent);
        assert_eq!(events.len(), 1, "agent {agent}");
        assert!(matches!(
            &events[0],
            AgentEvent::BarrierRelease { barrier_id, arrived_count: 2, .. } if barrier_id == "barrier-Y"
        ));
    }

    let barrier = h.coordinator.barriers().get_barrier("barrier-Y").unwrap();
    assert!(barrier.is_empty());
}

#[tokio::test]
async fn barrier_uses_default_expected_count() {
    let mut h = setup_with(CoordinatorConfig {
        default_expected_count: 3,
        ..CoordinatorConfig::default()
    });

    let response = h
        .coordinator
        .barrier_enter(&conn(), BarrierEnterRequest::new("b").with_agent("A"))
        .await
        .unwrap();

    assert_eq!(response.expected_count, 3);
    assert!(!response.released);
}

#[tokio::test]
async fn expired_lock_is_granted_to_next_acquirer() {
    let mut h = setup();

    assert!(h.acquire("lock-X", "A", 1.0).await.granted);
    h.clock.advance(Duration::from_secs(2));

    let c = h.acquire("lock-X", "C", 30.0).await;
    assert!(c.granted);
    assert_eq!(h.holder("lock-X").as_deref(), Some("C"));
}

#[tokio::test]
async fn firing_expiry_promotes_waiter() {
    let mut h = setup();

    h.acquire("lock-X", "A", 5.0).await;
    h.acquire("lock-X", "B", 10.0).await;
    assert_eq!(
        h.coordinator.next_deadline(),
        Some(h.clock.now() + Duration::from_secs(5))
    );

    h.clock.advance(Duration::from_secs(4));
    assert_eq!(h.coordinator.fire_due_timers().await, 0);
    assert_eq!(h.holder("lock-X").as_deref(), Some("A"));

    h.clock.advance(Duration::from_secs(1));
    assert_eq!(h.coordinator.fire_due_timers().await, 1);
    assert_eq!(h.holder("lock-X").as_deref(), Some("B"));
    assert_eq!(h.notifier.events_for("B").len(), 1);

    // B's lease is armed from the moment of promotion
    assert_eq!(
        h.coordinator.next_deadline(),
        Some(h.clock.now() + Duration::from_secs(10))
    );
}

#[tokio::test]
async fn released_lock_does_not_fire_stale_timer() {
    let mut h = setup();

    h.acquire("lock-X", "A", 5.0).await;
    h.release("lock-X", "A").await;
    h.acquire("lock-X", "B", 30.0).await;

    h.clock.advance(Duration::from_secs(6));
    assert_eq!(h.coordinator.fire_due_timers().await, 0);
    assert_eq!(h.holder("lock-X").as_deref(), Some("B"));
}

#[tokio::test]
async fn reacquire_by_holder_extends_lease() {
    let mut h = setup();

    h.acquire("lock-X", "A", 5.0).await;
    h.clock.advance(Duration::from_secs(3));
    let renewed = h.acquire("lock-X", "A", 5.0).await;
    assert!(renewed.granted);

    h.clock.advance(Duration::from_secs(3));
    assert_eq!(h.coordinator.fire_due_timers().await, 0);
    assert_eq!(h.holder("lock-X").as_deref(), Some("A"));
}

#[tokio::test]
async fn release_by_non_holder_is_refused() {
    let mut h = setup();

    h.acquire("lock-Z", "A", 30.0).await;
    let response = h.release("lock-Z", "B").await;

    assert!(!response.released);
    assert_eq!(response.error.as_deref(), Some("not holder"));
    assert_eq!(h.holder("lock-Z").as_deref(), Some("A"));
}

#[tokio::test]
async fn release_of_unknown_lock_is_refused_without_creating_it() {
    let mut h = setup();

    let response = h.release("never-acquired", "A").await;

    assert!(!response.released);
    assert!(h.coordinator.locks().get_lock("never-acquired").is_none());
}

#[parameterized(
    missing_lock = { AcquireLockRequest { agent_id: Some("A".into()), ..Default::default() } },
    empty_lock = { AcquireLockRequest::new("").with_agent("A") },
    zero_timeout = { AcquireLockRequest::new("l").with_agent("A").with_timeout(0.0) },
    negative_timeout = { AcquireLockRequest::new("l").with_agent("A").with_timeout(-1.0) },
    nan_timeout = { AcquireLockRequest::new("l").with_agent("A").with_timeout(f64::NAN) },
    huge_timeout = { AcquireLockRequest::new("l").with_agent("A").with_timeout(1e30) },
    no_agent = { AcquireLockRequest::new("l") },
)]
fn invalid_acquire_is_rejected(request: AcquireLockRequest) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let mut h = setup();
        let err = h
            .coordinator
            .acquire_lock(&conn(), request)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(h.coordinator.locks().lock_names().is_empty());
        assert!(h.coordinator.next_deadline().is_none());
    });
}

#[tokio::test]
async fn invalid_barrier_enter_is_rejected() {
    let mut h = setup();

    let zero = h
        .coordinator
        .barrier_enter(
            &conn(),
            BarrierEnterRequest::new("b")
                .with_agent("A")
                .with_expected_count(0),
        )
        .await
        .unwrap_err();
    let empty = h
        .coordinator
        .barrier_enter(&conn(), BarrierEnterRequest::new("").with_agent("A"))
        .await
        .unwrap_err();

    assert_eq!(zero.code(), ErrorCode::InvalidInput);
    assert_eq!(empty.code(), ErrorCode::InvalidInput);
    assert!(h.coordinator.barriers().barrier_names().is_empty());
}

#[tokio::test]
async fn invalid_release_is_rejected() {
    let mut h = setup();

    let err = h
        .coordinator
        .release_lock(&conn(), ReleaseLockRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn registered_connection_supplies_agent_id() {
    let mut h = setup();
    h.sessions.bind("conn-1", "A");

    let response = h
        .coordinator
        .acquire_lock(&conn(), AcquireLockRequest::new("lock-X"))
        .await
        .unwrap();

    assert!(response.granted);
    assert_eq!(h.holder("lock-X").as_deref(), Some("A"));
    assert_eq!(
        response.expires_at,
        Some(h.clock.utc_now() + chrono::Duration::seconds(30))
    );
}

#[tokio::test]
async fn explicit_agent_id_overrides_session() {
    let mut h = setup();
    h.sessions.bind("conn-1", "A");

    h.acquire("lock-X", "B", 30.0).await;

    assert_eq!(h.holder("lock-X").as_deref(), Some("B"));
}

#[tokio::test]
async fn whitespace_ids_are_ordinary_identifiers() {
    let mut h = setup();
    h.sessions.bind("conn-1", "A");

    let response = h.acquire(" ", " ", 30.0).await;

    assert!(response.granted);
    assert_eq!(h.holder(" ").as_deref(), Some(" "));
}

#[tokio::test]
async fn disconnect_hands_lock_to_next_waiter() {
    let mut h = setup();

    h.acquire("lock-X", "A", 30.0).await;
    h.acquire("lock-X", "B", 30.0).await;
    h.acquire("lock-X", "C", 30.0).await;

    h.coordinator.agent_disconnected(&AgentId::new("A")).await;

    assert_eq!(h.holder("lock-X").as_deref(), Some("B"));
    let lock = h.coordinator.locks().get_lock("lock-X").unwrap();
    assert_eq!(lock.queue_position(&AgentId::new("C")), Some(1));
    assert_eq!(h.notifier.events_for("B").len(), 1);
}

#[tokio::test]
async fn disconnect_removes_waiter() {
    let mut h = setup();

    h.acquire("lock-X", "A", 30.0).await;
    h.acquire("lock-X", "B", 30.0).await;

    h.coordinator.agent_disconnected(&AgentId::new("B")).await;
    h.release("lock-X", "A").await;

    assert!(h.coordinator.locks().get_lock("lock-X").unwrap().is_free());
    assert!(h.notifier.calls().is_empty());
}

#[tokio::test]
async fn disconnect_keeps_locks_when_release_disabled() {
    let mut h = setup_with(CoordinatorConfig {
        release_on_disconnect: false,
        ..CoordinatorConfig::default()
    });

    h.acquire("lock-X", "A", 30.0).await;
    h.coordinator.agent_disconnected(&AgentId::new("A")).await;

    assert_eq!(h.holder("lock-X").as_deref(), Some("A"));
}

#[tokio::test]
async fn notify_failure_does_not_roll_back_grant() {
    let mut h = setup();
    h.notifier.set_unreachable("B");

    h.acquire("lock-X", "A", 30.0).await;
    h.acquire("lock-X", "B", 30.0).await;
    let released = h.release("lock-X", "A").await;

    assert!(released.released);
    assert_eq!(h.holder("lock-X").as_deref(), Some("B"));
    assert_eq!(h.notifier.calls().len(), 1);
}

#[tokio::test]
async fn maintenance_resets_stale_barrier_and_prunes() {
    let mut h = setup();
    let task = MaintenanceTask::new(
        MaintenanceConfig::new().with_barrier_stale_after(Duration::from_secs(60)),
        h.clock.clone(),
    );

    h.enter("stuck", "A", 2).await;
    h.acquire("lock-X", "A", 30.0).await;
    h.release("lock-X", "A").await;

    h.clock.advance(Duration::from_secs(61));
    h.coordinator.maintain(&task).await;

    assert!(h.coordinator.barriers().barrier_names().is_empty());
    assert!(h.coordinator.locks().lock_names().is_empty());
    assert_eq!(h.coordinator.stats(), CoordinationStats::default());
}

#[tokio::test]
async fn stats_reflect_live_resources() {
    let mut h = setup();

    h.acquire("lock-X", "A", 30.0).await;
    h.acquire("lock-X", "B", 30.0).await;
    h.enter("barrier-Y", "C", 3).await;

    let stats = h.coordinator.stats();
    assert_eq!(stats.total_locks, 1);
    assert_eq!(stats.held_locks, 1);
    assert_eq!(stats.waiting_agents, 1);
    assert_eq!(stats.active_barriers, 1);
    assert_eq!(stats.arrived_agents, 1);
}

#[test]
fn config_parses_humantime_timeout() {
    let config: CoordinatorConfig =
        serde_json::from_str(r#"{"default_lock_timeout": "1m 30s"}"#).unwrap();

    assert_eq!(config.default_lock_timeout, Duration::from_secs(90));
    assert_eq!(config.default_expected_count, 2);
    assert!(config.release_on_disconnect);
}
