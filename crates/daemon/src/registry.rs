// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection registry
//!
//! Tracks live connections, the agent each one registered, and which
//! connection pushes for an agent are routed to. Serves as the router's
//! notifier and session resolver.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use a2a_adapters::{NotifyAdapter, NotifyError, SessionResolver};
use a2a_core::{AgentEvent, AgentId, ConnectionId};
use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::protocol::ServerFrame;

struct ConnectionEntry {
    outbound: mpsc::Sender<ServerFrame>,
    /// Agent bound with `register`
    registered: Option<AgentId>,
    /// Agents whose pushes go to this connection
    routed: BTreeSet<AgentId>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    routes: HashMap<AgentId, ConnectionId>,
}

impl RegistryState {
    /// Route an agent to a connection, taking it away from any other
    fn route(&mut self, connection: &ConnectionId, agent_id: &AgentId) {
        if let Some(previous) = self.routes.get(agent_id) {
            if previous == connection {
                return;
            }
            if let Some(entry) = self.connections.get_mut(previous) {
                entry.routed.remove(agent_id);
                if entry.registered.as_ref() == Some(agent_id) {
                    entry.registered = None;
                }
            }
        }
        if let Some(entry) = self.connections.get_mut(connection) {
            entry.routed.insert(agent_id.clone());
            self.routes.insert(agent_id.clone(), connection.clone());
        }
    }

    fn unroute(&mut self, connection: &ConnectionId, agent_id: &AgentId) {
        if self.routes.get(agent_id) == Some(connection) {
            self.routes.remove(agent_id);
        }
        if let Some(entry) = self.connections.get_mut(connection) {
            entry.routed.remove(agent_id);
        }
    }
}

/// Shared registry of live connections
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a connection with its outbound frame channel
    pub fn connect(&self, connection: ConnectionId, outbound: mpsc::Sender<ServerFrame>) {
        self.state().connections.insert(
            connection,
            ConnectionEntry {
                outbound,
                registered: None,
                routed: BTreeSet::new(),
            },
        );
    }

    /// Remove a connection; returns the agents that were reachable only through it
    pub fn disconnect(&self, connection: &ConnectionId) -> Vec<AgentId> {
        let mut state = self.state();
        let Some(entry) = state.connections.remove(connection) else {
            return Vec::new();
        };

        let mut orphaned = Vec::new();
        for agent_id in entry.routed {
            if state.routes.get(&agent_id) == Some(connection) {
                state.routes.remove(&agent_id);
                orphaned.push(agent_id);
            }
        }
        orphaned
    }

    /// Bind an agent to a connection as its default identity
    ///
    /// An agent registered elsewhere moves to the newest connection.
    /// Returns the agent previously registered on this connection, if it was
    /// a different one.
    pub fn register(&self, connection: &ConnectionId, agent_id: AgentId) -> Option<AgentId> {
        let mut state = self.state();
        if !state.connections.contains_key(connection) {
            return None;
        }

        state.route(connection, &agent_id);

        let previous = state
            .connections
            .get_mut(connection)
            .and_then(|entry| entry.registered.replace(agent_id.clone()))
            .filter(|previous| previous != &agent_id);
        if let Some(previous) = &previous {
            state.unroute(connection, previous);
        }
        previous
    }

    /// Drop the registered agent of a connection
    pub fn unregister(&self, connection: &ConnectionId) -> Option<AgentId> {
        let mut state = self.state();
        let agent_id = state
            .connections
            .get_mut(connection)
            .and_then(|entry| entry.registered.take())?;
        state.unroute(connection, &agent_id);
        Some(agent_id)
    }

    /// Route pushes for an agent named explicitly in a request
    ///
    /// Does not change the connection's registered agent.
    pub fn observe(&self, connection: &ConnectionId, agent_id: &AgentId) {
        let mut state = self.state();
        if state.routes.contains_key(agent_id) {
            return;
        }
        state.route(connection, agent_id);
    }

    pub fn connection_count(&self) -> usize {
        self.state().connections.len()
    }

    pub fn agent_count(&self) -> usize {
        self.state().routes.len()
    }

    /// Connection pushes for an agent are delivered to
    pub fn connection_for(&self, agent_id: &AgentId) -> Option<ConnectionId> {
        self.state().routes.get(agent_id).cloned()
    }
}

#[async_trait]
impl NotifyAdapter for ConnectionRegistry {
    async fn notify(&self, agent_id: &AgentId, event: &AgentEvent) -> Result<(), NotifyError> {
        let outbound = {
            let state = self.state();
            state
                .routes
                .get(agent_id)
                .and_then(|connection| state.connections.get(connection))
                .map(|entry| entry.outbound.clone())
        };
        let Some(outbound) = outbound else {
            return Err(NotifyError::Unreachable(agent_id.clone()));
        };

        outbound
            .try_send(ServerFrame::Event {
                event: event.clone(),
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => NotifyError::Backpressure(agent_id.clone()),
                TrySendError::Closed(_) => NotifyError::Unreachable(agent_id.clone()),
            })
    }
}

impl SessionResolver for ConnectionRegistry {
    fn default_agent_id(&self, connection: &ConnectionId) -> Option<AgentId> {
        self.state()
            .connections
            .get(connection)
            .and_then(|entry| entry.registered.clone())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
