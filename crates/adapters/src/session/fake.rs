// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session resolver for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::SessionResolver;
use a2a_core::{AgentId, ConnectionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Session resolver backed by an in-memory table
#[derive(Clone, Default)]
pub struct FakeSessionResolver {
    sessions: Arc<Mutex<HashMap<ConnectionId, AgentId>>>,
}

impl FakeSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to an agent
    pub fn bind(&self, connection: impl Into<String>, agent_id: impl Into<String>) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ConnectionId::new(connection), AgentId::new(agent_id));
    }
}

impl SessionResolver for FakeSessionResolver {
    fn default_agent_id(&self, connection: &ConnectionId) -> Option<AgentId> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(connection)
            .cloned()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
