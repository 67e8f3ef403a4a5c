use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use spark_types::events::{GatewayCommand, GatewayEvent};

use crate::broker::RoomBroker;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection.
///
/// The connection holds an unbounded channel the broker fans out into; the
/// send task forwards those events as JSON text frames. The recv task parses
/// `join-room` / `leave-room` commands. Teardown removes every subscription
/// this connection holds — room membership is ephemeral by design.
pub async fn handle_connection(socket: WebSocket, broker: RoomBroker) {
    let (mut sender, mut receiver) = socket.split();

    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayEvent>();

    info!("connection {} opened", conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward broker events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("failed to serialize gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let broker_recv = broker.clone();
    let tx_recv = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&broker_recv, conn_id, &tx_recv, cmd).await,
                    Err(e) => {
                        warn!(
                            "connection {} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            log_snippet(&text)
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    broker.unsubscribe_all(conn_id).await;
    info!("connection {} closed", conn_id);
}

/// Truncate a bad frame for logging. The cut must land on a char boundary:
/// clients control the frame contents, and a multi-byte sequence straddling
/// the limit must not panic the recv task.
fn log_snippet(text: &str) -> &str {
    const MAX: usize = 200;
    let mut end = text.len().min(MAX);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn handle_command(
    broker: &RoomBroker,
    conn_id: Uuid,
    tx: &mpsc::UnboundedSender<GatewayEvent>,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::JoinRoom { room_id } => {
            info!("connection {} joined room {}", conn_id, room_id);
            broker.subscribe(room_id, conn_id, tx.clone()).await;
        }
        GatewayCommand::LeaveRoom { room_id } => {
            info!("connection {} left room {}", conn_id, room_id);
            broker.unsubscribe(room_id, conn_id).await;
        }
    }
}
