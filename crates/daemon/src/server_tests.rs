// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{ClientFrame, ReplyBody};
use a2a_engine::ErrorCode;
use tokio::io::DuplexStream;

async fn send(stream: &mut DuplexStream, request_id: u64, request: Request) {
    let data = protocol::encode(&ClientFrame {
        request_id,
        request,
    })
    .unwrap();
    protocol::write_message(stream, &data).await.unwrap();
}

async fn recv(stream: &mut DuplexStream) -> ServerFrame {
    let bytes = protocol::read_message(stream).await.unwrap();
    protocol::decode(&bytes).unwrap()
}

fn reply_of(frame: ServerFrame) -> (u64, Reply) {
    match frame {
        ServerFrame::Response { request_id, reply } => (request_id, reply),
        other => panic!("expected response, got {other:?}"),
    }
}

/// Minimal router answering pings; returns the commands it saw
fn spawn_fake_router(mut rx: mpsc::Receiver<Command>) -> tokio::task::JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        let mut outbound = None;
        while let Some(command) = rx.recv().await {
            match command {
                Command::Connected { outbound: tx, .. } => {
                    seen.push("connected".to_string());
                    outbound = Some(tx);
                }
                Command::Request { request, reply, .. } => {
                    seen.push(request.kind().to_string());
                    let _ = reply.send(Reply::ok(ReplyBody::Pong));
                }
                Command::Disconnected { .. } => {
                    seen.push("disconnected".to_string());
                    outbound.take();
                    break;
                }
            }
        }
        seen
    })
}

#[tokio::test]
async fn requests_round_trip_through_router() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (commands, rx) = mpsc::channel(8);
    let router = spawn_fake_router(rx);
    let task = tokio::spawn(handle_connection(
        server,
        ConnectionId::new("c1"),
        commands,
        8,
    ));

    send(&mut client, 41, Request::Ping).await;
    let (request_id, reply) = reply_of(recv(&mut client).await);
    assert_eq!(request_id, 41);
    assert_eq!(reply, Reply::ok(ReplyBody::Pong));

    drop(client);
    task.await.unwrap().unwrap();
    assert_eq!(
        router.await.unwrap(),
        vec!["connected", "ping", "disconnected"]
    );
}

#[tokio::test]
async fn pushed_frames_share_the_connection() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (commands, mut rx) = mpsc::channel(8);
    let task = tokio::spawn(handle_connection(
        server,
        ConnectionId::new("c1"),
        commands,
        8,
    ));

    let outbound = match rx.recv().await.unwrap() {
        Command::Connected { outbound, .. } => outbound,
        other => panic!("expected connected, got {other:?}"),
    };
    let event = a2a_core::AgentEvent::LockGranted {
        lock_id: "lock-X".to_string(),
        expires_at: chrono::Utc::now(),
    };
    outbound
        .send(ServerFrame::Event {
            event: event.clone(),
        })
        .await
        .unwrap();

    assert_eq!(recv(&mut client).await, ServerFrame::Event { event });

    drop(outbound);
    drop(client);
    assert!(matches!(
        rx.recv().await,
        Some(Command::Disconnected { .. })
    ));
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn router_gone_answers_backend_unavailable() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (commands, rx) = mpsc::channel(8);
    drop(rx);
    let task = tokio::spawn(handle_connection(
        server,
        ConnectionId::new("c1"),
        commands,
        8,
    ));

    send(&mut client, 1, Request::Status).await;
    let (request_id, reply) = reply_of(recv(&mut client).await);

    assert_eq!(request_id, 1);
    assert!(!reply.success);
    assert_eq!(reply.error_code, Some(ErrorCode::BackendUnavailable));

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_request_is_invalid_input() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (commands, rx) = mpsc::channel(8);
    let router = spawn_fake_router(rx);
    let task = tokio::spawn(handle_connection(
        server,
        ConnectionId::new("c1"),
        commands,
        8,
    ));

    protocol::write_message(
        &mut client,
        br#"{"request_id":5,"request":{"type":"teleport"}}"#,
    )
    .await
    .unwrap();
    let (request_id, reply) = reply_of(recv(&mut client).await);

    assert_eq!(request_id, 5);
    assert_eq!(reply.error_code, Some(ErrorCode::InvalidInput));

    // The connection stays usable
    send(&mut client, 6, Request::Ping).await;
    let (request_id, reply) = reply_of(recv(&mut client).await);
    assert_eq!(request_id, 6);
    assert!(reply.success);

    drop(client);
    task.await.unwrap().unwrap();
    assert_eq!(
        router.await.unwrap(),
        vec!["connected", "ping", "disconnected"]
    );
}
