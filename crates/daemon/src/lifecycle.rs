// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router lifecycle: startup, main loop, shutdown.
//!
//! The router loop is the only place coordination state is touched.
//! Connection tasks reach it through the command channel.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use a2a_adapters::TracedNotifyAdapter;
use a2a_core::{AgentId, ConnectionId, IdGen, MaintenanceTask, SystemClock, UuidIdGen};
use a2a_engine::{CoordinationError, Coordinator};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigError};
use crate::protocol::{Reply, ReplyBody, Request, ServerFrame, StatusReport, PROTOCOL_VERSION};
use crate::registry::ConnectionRegistry;
use crate::server;

/// Coordinator with the router's concrete adapters
pub type DaemonCoordinator =
    Coordinator<TracedNotifyAdapter<ConnectionRegistry>, ConnectionRegistry, SystemClock>;

/// Commands queued before connection tasks wait on the router
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Messages from connection tasks to the router loop
#[derive(Debug)]
pub enum Command {
    Connected {
        connection: ConnectionId,
        outbound: mpsc::Sender<ServerFrame>,
    },
    Request {
        connection: ConnectionId,
        request: Request,
        reply: oneshot::Sender<Reply>,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, #[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid log path: {0}")]
    InvalidLogPath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Router state during operation
pub struct Router {
    config: Config,
    listener: TcpListener,
    coordinator: DaemonCoordinator,
    registry: ConnectionRegistry,
    maintenance: MaintenanceTask<SystemClock>,
    commands_tx: mpsc::Sender<Command>,
    commands: mpsc::Receiver<Command>,
    id_gen: UuidIdGen,
    start_time: Instant,
}

/// Bind the listener and build the router
pub async fn startup(config: &Config) -> Result<Router, LifecycleError> {
    config.validate()?;

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen, e))?;

    let registry = ConnectionRegistry::new();
    let coordinator = Coordinator::new(
        config.coordinator.clone(),
        TracedNotifyAdapter::new(registry.clone()),
        registry.clone(),
        SystemClock,
    );
    let maintenance = MaintenanceTask::new(config.maintenance.clone(), SystemClock);
    let (commands_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

    let local_addr = listener.local_addr()?;
    info!(
        listen = %local_addr,
        default_lock_timeout = ?config.coordinator.default_lock_timeout,
        release_on_disconnect = config.coordinator.release_on_disconnect,
        "Router started"
    );

    Ok(Router {
        config: config.clone(),
        listener,
        coordinator,
        registry,
        maintenance,
        commands_tx,
        commands,
        id_gen: UuidIdGen,
        start_time: Instant::now(),
    })
}

impl Router {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, LifecycleError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run until `shutdown` resolves
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut maintenance = tokio::time::interval(self.maintenance.interval());
        maintenance.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        maintenance.tick().await;

        loop {
            let deadline = self.coordinator.next_deadline();

            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => error!("Error accepting connection: {}", e),
                    }
                }

                Some(command) = self.commands.recv() => {
                    self.handle_command(command).await;
                }

                _ = sleep_until(deadline) => {
                    let fired = self.coordinator.fire_due_timers().await;
                    debug!(fired, "Lock expiry timers fired");
                }

                _ = maintenance.tick() => {
                    self.coordinator.maintain(&self.maintenance).await;
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn spawn_connection<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let connection = ConnectionId::new(self.id_gen.next());
        let commands = self.commands_tx.clone();
        let capacity = self.config.outbound_capacity;
        info!(%connection, %peer, "Connection accepted");

        tokio::spawn(async move {
            if let Err(e) =
                server::handle_connection(stream, connection.clone(), commands, capacity).await
            {
                warn!(%connection, error = %e, "Connection closed with error");
            }
        });
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connected {
                connection,
                outbound,
            } => {
                self.registry.connect(connection, outbound);
            }

            Command::Request {
                connection,
                request,
                reply,
            } => {
                let kind = request.kind();
                let response = self.handle_request(&connection, request).await;
                debug!(%connection, kind, success = response.success, "Request handled");
                if reply.send(response).is_err() {
                    debug!(%connection, kind, "Connection went away before reply");
                }
            }

            Command::Disconnected { connection } => {
                let orphaned = self.registry.disconnect(&connection);
                info!(%connection, agents = orphaned.len(), "Connection closed");
                for agent_id in orphaned {
                    self.coordinator.agent_disconnected(&agent_id).await;
                }
            }
        }
    }

    async fn handle_request(&mut self, connection: &ConnectionId, request: Request) -> Reply {
        match request {
            Request::Hello { version } => {
                if version != PROTOCOL_VERSION {
                    warn!(
                        %connection,
                        client = %version,
                        router = PROTOCOL_VERSION,
                        "Protocol version mismatch"
                    );
                }
                Reply::ok(ReplyBody::Hello {
                    version: PROTOCOL_VERSION.to_string(),
                })
            }

            Request::Register { agent_id } => {
                if agent_id.is_empty() {
                    return Reply::error(&CoordinationError::InvalidInput(
                        "agent_id is required".to_string(),
                    ));
                }
                let agent = AgentId::new(agent_id.clone());
                if let Some(previous) = self.registry.register(connection, agent) {
                    info!(%connection, %previous, "Connection re-registered");
                    self.coordinator.agent_disconnected(&previous).await;
                }
                info!(%connection, agent = %agent_id, "Agent registered");
                Reply::ok(ReplyBody::Registered { agent_id })
            }

            Request::Unregister => {
                let agent = self.registry.unregister(connection);
                if let Some(agent) = &agent {
                    info!(%connection, %agent, "Agent unregistered");
                    self.coordinator.agent_disconnected(agent).await;
                }
                Reply::ok(ReplyBody::Unregistered {
                    agent_id: agent.map(|a| a.0),
                })
            }

            Request::Ping => Reply::ok(ReplyBody::Pong),

            Request::Status => Reply::ok(ReplyBody::Status(StatusReport {
                version: PROTOCOL_VERSION.to_string(),
                uptime_secs: self.start_time.elapsed().as_secs(),
                connections: self.registry.connection_count(),
                agents: self.registry.agent_count(),
                coordination: self.coordinator.stats(),
            })),

            Request::AcquireLock(request) => {
                let agent_id = request.agent_id.clone();
                match self.coordinator.acquire_lock(connection, request).await {
                    Ok(response) => {
                        self.observe(connection, agent_id.as_deref());
                        Reply::ok(ReplyBody::AcquireLock(response))
                    }
                    Err(e) => Reply::error(&e),
                }
            }

            Request::ReleaseLock(request) => {
                let agent_id = request.agent_id.clone();
                match self.coordinator.release_lock(connection, request).await {
                    Ok(response) => {
                        self.observe(connection, agent_id.as_deref());
                        Reply::release(response)
                    }
                    Err(e) => Reply::error(&e),
                }
            }

            Request::BarrierEnter(request) => {
                let agent_id = request.agent_id.clone();
                match self.coordinator.barrier_enter(connection, request).await {
                    Ok(response) => {
                        self.observe(connection, agent_id.as_deref());
                        Reply::ok(ReplyBody::BarrierEnter(response))
                    }
                    Err(e) => Reply::error(&e),
                }
            }
        }
    }

    /// Route pushes for an agent named in an accepted request back to this connection
    fn observe(&self, connection: &ConnectionId, agent_id: Option<&str>) {
        if let Some(agent_id) = agent_id.filter(|id| !id.is_empty()) {
            self.registry.observe(connection, &AgentId::new(agent_id));
        }
    }

    fn shutdown(&self) {
        let stats = self.coordinator.stats();
        info!(
            connections = self.registry.connection_count(),
            held_locks = stats.held_locks,
            active_barriers = stats.active_barriers,
            "Router shutdown complete"
        );
    }
}

/// Sleep until the next timer deadline, or forever when none is pending
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
