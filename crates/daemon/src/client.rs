// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-side client for the router
//!
//! Requests are sent one at a time. Events pushed while waiting for a reply
//! are buffered and handed out by [`RouterClient::next_event`]. Incoming bytes
//! are buffered too, so a read that times out mid-frame leaves the stream in
//! sync for the next call.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use a2a_core::AgentEvent;
use a2a_engine::{
    AcquireLockRequest, AcquireLockResponse, BarrierEnterRequest, BarrierEnterResponse,
    ErrorCode, ReleaseLockRequest, ReleaseLockResponse,
};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{
    self, ClientFrame, ProtocolError, Reply, ReplyBody, Request, ServerFrame, StatusReport,
    DEFAULT_TIMEOUT,
};

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {0}: {1}")]
    Connect(SocketAddr, #[source] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected ({code}): {message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("Unexpected response from router")]
    UnexpectedResponse,
}

/// Connection to the router
pub struct RouterClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    /// Bytes read but not yet decoded
    pending: Vec<u8>,
    next_request_id: u64,
    events: VecDeque<AgentEvent>,
    timeout: Duration,
}

impl RouterClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Connect(addr, e))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer,
            pending: Vec::new(),
            next_request_id: 1,
            events: VecDeque::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// How long to wait for a reply or an event
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request and wait for its reply
    pub async fn send(&mut self, request: Request) -> Result<Reply, ClientError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        protocol::write_frame(
            &mut self.writer,
            &ClientFrame {
                request_id,
                request,
            },
            self.timeout,
        )
        .await?;

        loop {
            match self.read_frame().await? {
                ServerFrame::Event { event } => self.events.push_back(event),
                ServerFrame::Response {
                    request_id: id,
                    reply,
                } if id == request_id => return Ok(reply),
                ServerFrame::Response { request_id: id, .. } => {
                    tracing::debug!(request_id = id, "Discarding stale reply");
                }
            }
        }
    }

    /// Next event pushed by the router
    pub async fn next_event(&mut self) -> Result<AgentEvent, ClientError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }
        loop {
            if let ServerFrame::Event { event } = self.read_frame().await? {
                return Ok(event);
            }
        }
    }

    pub async fn register(&mut self, agent_id: &str) -> Result<(), ClientError> {
        let reply = self
            .send(Request::Register {
                agent_id: agent_id.to_string(),
            })
            .await?;
        match accepted(reply)? {
            ReplyBody::Registered { .. } => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        match accepted(self.send(Request::Ping).await?)? {
            ReplyBody::Pong => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn status(&mut self) -> Result<StatusReport, ClientError> {
        match accepted(self.send(Request::Status).await?)? {
            ReplyBody::Status(report) => Ok(report),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn acquire_lock(
        &mut self,
        request: AcquireLockRequest,
    ) -> Result<AcquireLockResponse, ClientError> {
        match accepted(self.send(Request::AcquireLock(request)).await?)? {
            ReplyBody::AcquireLock(response) => Ok(response),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Release a lock; a refused release is returned, not raised
    pub async fn release_lock(
        &mut self,
        request: ReleaseLockRequest,
    ) -> Result<ReleaseLockResponse, ClientError> {
        let reply = self.send(Request::ReleaseLock(request)).await?;
        if let ReplyBody::ReleaseLock(response) = reply.body {
            return Ok(response);
        }
        accepted(reply)?;
        Err(ClientError::UnexpectedResponse)
    }

    pub async fn barrier_enter(
        &mut self,
        request: BarrierEnterRequest,
    ) -> Result<BarrierEnterResponse, ClientError> {
        match accepted(self.send(Request::BarrierEnter(request)).await?)? {
            ReplyBody::BarrierEnter(response) => Ok(response),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    async fn read_frame(&mut self) -> Result<ServerFrame, ClientError> {
        let bytes = tokio::time::timeout(self.timeout, self.fill_message())
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(protocol::decode(&bytes)?)
    }

    /// Read until a whole message is buffered
    async fn fill_message(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut chunk = [0u8; 8192];
        loop {
            if let Some(message) = protocol::split_message(&mut self.pending)? {
                return Ok(message);
            }
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Body of a successful reply, or the rejection it carries
fn accepted(reply: Reply) -> Result<ReplyBody, ClientError> {
    if reply.success {
        return Ok(reply.body);
    }
    let message = reply.error_message().unwrap_or_default().to_string();
    Err(ClientError::Rejected {
        code: reply.error_code.unwrap_or(ErrorCode::ExecutionFailed),
        message,
    })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
