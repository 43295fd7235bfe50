// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection handling.
//!
//! Each connection reads requests one at a time and forwards them to the
//! router loop. A writer task owns the write half and drains the outbound
//! channel, which carries both replies and pushed events.

use a2a_core::ConnectionId;
use a2a_engine::CoordinationError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::lifecycle::Command;
use crate::protocol::{self, ProtocolError, Reply, Request, ServerFrame, DEFAULT_TIMEOUT};

/// Serve a single client connection until it closes
pub async fn handle_connection<S>(
    stream: S,
    connection: ConnectionId,
    commands: mpsc::Sender<Command>,
    outbound_capacity: usize,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerFrame>(outbound_capacity);

    let registered = commands
        .send(Command::Connected {
            connection: connection.clone(),
            outbound: outbound_tx.clone(),
        })
        .await;
    if registered.is_err() {
        warn!(%connection, "Router unavailable, requests will be refused");
    }

    let writer_connection = connection.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = protocol::write_frame(&mut writer, &frame, DEFAULT_TIMEOUT).await {
                warn!(connection = %writer_connection, error = %e, "Failed to write frame");
                break;
            }
        }
    });

    let result = read_requests(&mut reader, &connection, &commands, &outbound_tx).await;

    // The registry drops its sender on disconnect, which ends the writer
    let _ = commands
        .send(Command::Disconnected {
            connection: connection.clone(),
        })
        .await;
    drop(outbound_tx);
    let _ = writer_task.await;

    result
}

async fn read_requests<R: AsyncRead + Unpin>(
    reader: &mut R,
    connection: &ConnectionId,
    commands: &mpsc::Sender<Command>,
    outbound: &mpsc::Sender<ServerFrame>,
) -> Result<(), ServerError> {
    loop {
        let bytes = match protocol::read_message(reader).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => {
                debug!(%connection, "Client disconnected");
                return Ok(());
            }
            Err(e) => return Err(ServerError::Protocol(e)),
        };

        let (request_id, reply) = match protocol::decode_client_frame(&bytes) {
            Ok(frame) => {
                debug!(
                    %connection,
                    request_id = frame.request_id,
                    kind = frame.request.kind(),
                    "Received request"
                );
                let reply = dispatch(commands, connection, frame.request).await;
                (frame.request_id, reply)
            }
            Err((request_id, e)) => {
                warn!(%connection, error = %e, "Malformed request");
                let error = CoordinationError::InvalidInput(format!("malformed request: {e}"));
                (request_id.unwrap_or(0), Reply::error(&error))
            }
        };

        outbound
            .send(ServerFrame::Response { request_id, reply })
            .await
            .map_err(|_| ServerError::WriterClosed)?;
    }
}

/// Hand a request to the router loop and wait for its reply
async fn dispatch(
    commands: &mpsc::Sender<Command>,
    connection: &ConnectionId,
    request: Request,
) -> Reply {
    let (reply_tx, reply_rx) = oneshot::channel();
    let command = Command::Request {
        connection: connection.clone(),
        request,
        reply: reply_tx,
    };

    if commands.send(command).await.is_err() {
        return unavailable();
    }
    reply_rx.await.unwrap_or_else(|_| unavailable())
}

fn unavailable() -> Reply {
    Reply::error(&CoordinationError::BackendUnavailable(
        "router is not running".to_string(),
    ))
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Connection writer closed")]
    WriterClosed,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
