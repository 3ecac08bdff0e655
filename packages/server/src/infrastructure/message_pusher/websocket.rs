//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの有限キュー（`PusherChannel`）を管理
//! - クライアントへのメッセージ送信（push_to, broadcast）
//! - キューが溢れた遅い受信者の追い出し
//!
//! ## 設計ノート
//!
//! WebSocket の受付は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `PusherChannel` を受け取り、メッセージ送信に使用します。
//! 送信はチャンネルへの投入のみで完了し、ソケットへの書き込みは接続ごとのタスクが行います。
//! 投入は待たないため、1 つの遅い接続が他の接続への配信を止めることはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel, RelayEvent},
    infrastructure::dto::conversion::encode_relay_event,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let (tx, rx) = pusher_channel(256);
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_client(connection_id.clone(), tx).await;
///
/// // クライアントに送信
/// pusher.push_to(&connection_id, "{\"type\":\"ack\",\"success\":true}").await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信チャンネル
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }
}

/// キューへ積み、溢れていれば接続を追い出す
fn enqueue(
    clients: &mut HashMap<ConnectionId, PusherChannel>,
    connection_id: &ConnectionId,
    content: String,
) -> Result<(), MessagePushError> {
    let sender = clients
        .get(connection_id)
        .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;

    match sender.try_send(content) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            if let Some(sender) = clients.remove(connection_id) {
                sender.evict();
            }
            tracing::warn!("Outbound queue of '{}' is full, evicting", connection_id);
            Err(MessagePushError::SlowConsumer(connection_id.to_string()))
        }
        Err(e @ TrySendError::Closed(_)) => Err(MessagePushError::PushFailed(e.to_string())),
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Client '{}' registered to MessagePusher", connection_id);
        clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(connection_id);
        tracing::debug!("Client '{}' unregistered from MessagePusher", connection_id);
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let mut clients = self.clients.lock().await;
        enqueue(&mut clients, connection_id, content.to_string())?;
        tracing::debug!("Pushed message to client '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RelayEvent,
    ) -> Result<usize, MessagePushError> {
        if targets.is_empty() {
            return Ok(0);
        }

        let content =
            encode_relay_event(event).map_err(|e| MessagePushError::Encode(e.to_string()))?;
        let mut clients = self.clients.lock().await;

        let mut delivered = 0;
        for target in targets {
            // ブロードキャストでは一部の送信失敗を許容
            match enqueue(&mut clients, &target, content.clone()) {
                Ok(()) => delivered += 1,
                Err(MessagePushError::ClientNotFound(_)) => {
                    tracing::warn!("Client '{}' not found during broadcast, skipping", target)
                }
                Err(e) => tracing::warn!("Failed to push message to client '{}': {}", target, e),
            }
        }

        Ok(delivered)
    }
}
