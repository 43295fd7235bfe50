// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_resolver_returns_bound_agent() {
    let resolver = FakeSessionResolver::new();
    resolver.bind("conn-1", "a1");

    assert_eq!(
        resolver.default_agent_id(&ConnectionId::new("conn-1")),
        Some(AgentId::new("a1"))
    );
    assert_eq!(resolver.default_agent_id(&ConnectionId::new("conn-2")), None);
}

#[test]
fn fake_resolver_clones_share_bindings() {
    let resolver = FakeSessionResolver::new();
    let other = resolver.clone();
    other.bind("conn-1", "a1");

    assert!(resolver.default_agent_id(&ConnectionId::new("conn-1")).is_some());
}
