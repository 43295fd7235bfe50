// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between agents and the router
//!
//! Each frame is a 4-byte big-endian length followed by a JSON document.

use std::time::Duration;

use a2a_core::{AgentEvent, CoordinationStats};
use a2a_engine::{
    AcquireLockRequest, AcquireLockResponse, BarrierEnterRequest, BarrierEnterResponse,
    CoordinationError, ErrorCode, ReleaseLockRequest, ReleaseLockResponse,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version reported in hello replies
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound for writing a reply frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest frame accepted in either direction
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Frame sent by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    pub request_id: u64,
    pub request: Request,
}

/// Requests an agent can make
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Version handshake
    Hello { version: String },

    /// Bind an agent id to this connection
    Register { agent_id: String },

    /// Drop the agent bound to this connection
    Unregister,

    /// Health check
    Ping,

    /// Router status and coordination counters
    Status,

    AcquireLock(AcquireLockRequest),

    ReleaseLock(ReleaseLockRequest),

    BarrierEnter(BarrierEnterRequest),
}

impl Request {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Hello { .. } => "hello",
            Request::Register { .. } => "register",
            Request::Unregister => "unregister",
            Request::Ping => "ping",
            Request::Status => "status",
            Request::AcquireLock(_) => "acquire_lock",
            Request::ReleaseLock(_) => "release_lock",
            Request::BarrierEnter(_) => "barrier_enter",
        }
    }
}

/// Frame sent by the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Reply to the request with the same id
    Response { request_id: u64, reply: Reply },

    /// Unsolicited push to the agent
    Event { event: AgentEvent },
}

/// Outcome of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub success: bool,
    #[serde(flatten)]
    pub body: ReplyBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

/// Type-specific fields of a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyBody {
    Hello { version: String },
    Registered { agent_id: String },
    Unregistered { agent_id: Option<String> },
    Pong,
    Status(StatusReport),
    AcquireLock(AcquireLockResponse),
    ReleaseLock(ReleaseLockResponse),
    BarrierEnter(BarrierEnterResponse),
    Error { error: String },
}

/// Router status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub version: String,
    pub uptime_secs: u64,
    pub connections: usize,
    pub agents: usize,
    pub coordination: CoordinationStats,
}

impl Reply {
    pub fn ok(body: ReplyBody) -> Self {
        Self {
            success: true,
            body,
            error_code: None,
        }
    }

    pub fn error(error: &CoordinationError) -> Self {
        Self {
            success: false,
            body: ReplyBody::Error {
                error: error.to_string(),
            },
            error_code: Some(error.code()),
        }
    }

    /// A refused release keeps its release fields and is reported as failed
    pub fn release(response: ReleaseLockResponse) -> Self {
        if response.released {
            return Self::ok(ReplyBody::ReleaseLock(response));
        }
        Self {
            success: false,
            body: ReplyBody::ReleaseLock(response),
            error_code: Some(ErrorCode::ExecutionFailed),
        }
    }

    /// Human-readable error, if the request failed
    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            ReplyBody::Error { error } => Some(error),
            ReplyBody::ReleaseLock(r) => r.error.as_deref(),
            _ => None,
        }
    }
}

/// Serialize a value to JSON bytes (no length prefix)
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize JSON bytes
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode a client frame, recovering the request id when only the request is malformed
pub fn decode_client_frame(bytes: &[u8]) -> Result<ClientFrame, (Option<u64>, ProtocolError)> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| (None, ProtocolError::Json(e)))?;
    let request_id = value.get("request_id").and_then(|id| id.as_u64());
    serde_json::from_value(value).map_err(|e| (request_id, ProtocolError::Json(e)))
}

/// Read one length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buffer = vec![0u8; len];
    match reader.read_exact(&mut buffer).await {
        Ok(_) => Ok(buffer),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => Err(e.into()),
    }
}

/// Take one complete message off the front of `buffer`, if it holds one
///
/// Lets a reader keep partial frames across cancelled reads.
pub fn split_message(buffer: &mut Vec<u8>) -> Result<Option<Vec<u8>>, ProtocolError> {
    let Some(len_bytes) = buffer.first_chunk::<4>() else {
        return Ok(None);
    };
    let len = u32::from_be_bytes(*len_bytes) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    if buffer.len() < 4 + len {
        return Ok(None);
    }

    let message = buffer[4..4 + len].to_vec();
    buffer.drain(..4 + len);
    Ok(Some(message))
}

/// Write one length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Encode and write a frame within `timeout`
pub async fn write_frame<W: AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    frame: &T,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(frame)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
