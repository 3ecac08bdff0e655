//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};

use roomrelay_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{ConnectionId, PusherReceiver, pusher_channel},
    infrastructure::dto::websocket::{
        AckMessage, ClientEvent, ConnectedMessage, MessageData, MessageType, RateLimitInfo,
        RoomInfo, recover_request_id,
    },
    ui::{signal::shutdown_started, state::AppState},
    usecase::{JoinRoomError, SendMessageCommand, SendMessageError},
};

/// ハンドラ内部で予期しないエラーが起きた場合に返すメッセージ
const INTERNAL_ERROR: &str = "Internal server error";

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// 不透明な識別トークン（記録のみ、検証しない）
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.config.origin_allowed(origin) {
        tracing::warn!("Rejected WebSocket handshake from origin {:?}", origin);
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, query.token)))
}

/// Spawns a task that pushes queued frames (acks and broadcasts) to the WebSocket sender.
///
/// The task also pings the client every `ping_interval`, and sends a Close frame
/// once the server starts shutting down.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
    ping_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + ping_interval,
            ping_interval,
        );

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
                _ = shutdown_started(&mut shutdown) => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: "Server shutting down".into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, token: Option<String>) {
    let (mut sender, mut receiver) = socket.split();

    // Create a bounded channel for this connection to receive acks and broadcasts
    let (tx, PusherReceiver { messages, evicted }) =
        pusher_channel(state.config.outbound_queue_capacity);
    let connection = match state.usecases.connect.execute(token, tx).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    let connection_id = connection.id.clone();
    tracing::info!("'{}' connected", connection_id);

    // Tell the client its connection identity
    let connected = ConnectedMessage {
        r#type: MessageType::Connected,
        socket_id: connection_id.to_string(),
        timestamp: timestamp_to_rfc3339(connection.connected_at.value()),
    };
    let greeted = match serde_json::to_string(&connected) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode connected message: {}", e);
            false
        }
    };

    if greeted {
        let mut send_task = pusher_loop(
            messages,
            sender,
            state.config.ping_interval,
            state.shutdown.clone(),
        );
        let idle_timeout = state.config.idle_timeout();

        loop {
            tokio::select! {
                frame = tokio::time::timeout(idle_timeout, receiver.next()) => {
                    let msg = match frame {
                        Err(_) => {
                            tracing::info!(
                                "'{}' sent nothing for {:?}, treating as disconnected",
                                connection_id,
                                idle_timeout
                            );
                            break;
                        }
                        Ok(None) => break,
                        Ok(Some(Err(e))) => {
                            tracing::warn!("WebSocket error from '{}': {}", connection_id, e);
                            break;
                        }
                        Ok(Some(Ok(msg))) => msg,
                    };

                    match msg {
                        Message::Text(text) => {
                            tracing::debug!("Received from '{}': {}", connection_id, text.as_str());
                            handle_text(&state, &connection_id, text.as_str()).await;
                        }
                        Message::Close(_) => {
                            tracing::info!("'{}' requested close", connection_id);
                            break;
                        }
                        // Pong / Ping / Binary only count as liveness
                        _ => {}
                    }
                }
                _ = evicted.notified() => {
                    tracing::warn!("'{}' fell behind on outbound frames, closing", connection_id);
                    state.usecases.report_error.execute().await;
                    break;
                }
                _ = &mut send_task => break,
            }
        }
        send_task.abort();
    }

    if let Err(e) = state.usecases.disconnect.execute(&connection_id).await {
        tracing::warn!("Disconnect cleanup failed: {}", e);
    }
}

/// 受信したテキストフレームを処理し、必ず 1 つの ack を返す
async fn handle_text(state: &Arc<AppState>, connection_id: &ConnectionId, text: &str) {
    let ack = respond(state, connection_id, text).await;

    match serde_json::to_string(&ack) {
        Ok(json) => {
            if let Err(e) = state.message_pusher.push_to(connection_id, &json).await {
                tracing::warn!("Failed to send ack to '{}': {}", connection_id, e);
            }
        }
        Err(e) => tracing::error!("Failed to encode ack: {}", e),
    }
}

/// フレームを解釈してユースケースへ渡し、その結果の ack を組み立てる
async fn respond(state: &Arc<AppState>, connection_id: &ConnectionId, text: &str) -> AckMessage {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => {
            let request_id = event.request_id();
            // パニックはこのイベントの中に閉じ込める
            let task = tokio::spawn(dispatch(state.clone(), connection_id.clone(), event));
            match task.await {
                Ok(ack) => ack,
                Err(e) => {
                    tracing::error!("Event handler for '{}' failed: {}", connection_id, e);
                    state.usecases.report_error.execute().await;
                    AckMessage::failure(request_id, INTERNAL_ERROR)
                }
            }
        }
        Err(e) => {
            tracing::warn!("Invalid frame from '{}': {}", connection_id, e);
            state.usecases.report_error.execute().await;
            AckMessage::failure(recover_request_id(text), format!("Invalid event: {e}"))
        }
    }
}

async fn dispatch(
    state: Arc<AppState>,
    connection_id: ConnectionId,
    event: ClientEvent,
) -> AckMessage {
    let request_id = event.request_id();

    match event {
        ClientEvent::Join(request) => {
            match state
                .usecases
                .join_room
                .execute(&connection_id, request.room_id)
                .await
            {
                Ok(outcome) => AckMessage {
                    room_info: Some(RoomInfo::from(&outcome.room)),
                    ..AckMessage::success(request_id)
                },
                Err(e) => {
                    let retry_after = match &e {
                        JoinRoomError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
                        _ => None,
                    };
                    failure_ack(request_id, &e, retry_after)
                }
            }
        }
        ClientEvent::Message(request) => {
            let command = SendMessageCommand {
                room_id: request.room_id,
                content: request.content,
                extra: request.extra,
            };
            match state
                .usecases
                .send_message
                .execute(&connection_id, command)
                .await
            {
                Ok(sent) => {
                    let data = MessageData::from(&sent.message);
                    AckMessage {
                        timestamp: Some(data.timestamp.clone()),
                        message_data: Some(data),
                        rate_limit: Some(RateLimitInfo {
                            remaining: sent.remaining,
                            retry_after: None,
                        }),
                        ..AckMessage::success(request_id)
                    }
                }
                Err(e) => {
                    let retry_after = match &e {
                        SendMessageError::RateLimited { retry_after_secs } => {
                            Some(*retry_after_secs)
                        }
                        _ => None,
                    };
                    failure_ack(request_id, &e, retry_after)
                }
            }
        }
    }
}

fn failure_ack(
    request_id: Option<serde_json::Value>,
    error: &dyn std::error::Error,
    retry_after: Option<u64>,
) -> AckMessage {
    AckMessage {
        rate_limit: retry_after.map(|secs| RateLimitInfo {
            remaining: 0,
            retry_after: Some(secs),
        }),
        ..AckMessage::failure(request_id, error.to_string())
    }
}
