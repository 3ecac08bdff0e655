//! UseCase: メッセージ送信処理
//!
//! 送信者を除くルームの全メンバーへメッセージをファンアウトします。
//! 送信者がルームのメンバーであることは要求しません（ルームが存在すれば送信できます）。

use serde_json::{Map, Value};

use crate::domain::{
    ConnectionId, MessageContent, RateLimitDecision, RelayEvent, RelayMessage, RepositoryError,
    RoomId,
};

use super::{context::RelayContext, error::SendMessageError};

/// メッセージ送信の入力
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendMessageCommand {
    pub room_id: Option<String>,
    pub content: Option<String>,
    /// クライアントが付けたその他のフィールド
    pub extra: Map<String, Value>,
}

/// メッセージ送信の結果
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// サーバー時刻を付けたメッセージ
    pub message: RelayMessage,
    /// 配信できたメンバー数
    pub delivered: usize,
    /// 現在のウィンドウで残っているポイント
    pub remaining: u32,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    context: RelayContext,
}

impl SendMessageUseCase {
    pub fn new(context: RelayContext) -> Self {
        Self { context }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者の接続 ID
    /// * `command` - ルーム ID・本文・追加フィールド
    ///
    /// # Returns
    ///
    /// * `Ok(SentMessage)` - 配信したメッセージと配信数
    /// * `Err(SendMessageError)` - 検証エラー、未知のルーム、レート制限
    pub async fn execute(
        &self,
        sender: &ConnectionId,
        command: SendMessageCommand,
    ) -> Result<SentMessage, SendMessageError> {
        let _gate = self.context.gate.enter().await;

        let result = self.send(sender, command).await;
        match &result {
            Ok(sent) => {
                self.context.metrics.record_message().await;
                tracing::debug!(
                    "Relayed message from '{}' to room '{}' ({} deliveries)",
                    sender,
                    sent.message.room_id,
                    sent.delivered
                );
            }
            Err(e) => {
                tracing::warn!("Message from '{}' rejected: {}", sender, e);
                self.context.metrics.record_error().await;
            }
        }
        result
    }

    async fn send(
        &self,
        sender: &ConnectionId,
        command: SendMessageCommand,
    ) -> Result<SentMessage, SendMessageError> {
        // 1. 状態を変更する前に検証
        let room_id = RoomId::new(command.room_id.unwrap_or_default())?;
        let content = MessageContent::new(command.content.unwrap_or_default())?;

        if self.context.rooms.get_room(&room_id).await.is_none() {
            return Err(RepositoryError::RoomNotFound(room_id.into_string()).into());
        }

        // 2. レート制限
        let remaining = match self.context.rate_limiter.consume(sender).await {
            RateLimitDecision::Allowed { remaining } => remaining,
            RateLimitDecision::Rejected { retry_after } => {
                return Err(SendMessageError::RateLimited {
                    retry_after_secs: retry_after.as_millis().div_ceil(1000) as u64,
                });
            }
        };

        // 3. サーバー時刻を付けて、送信者以外のメンバーへ配信
        let message = RelayMessage::new(
            room_id.clone(),
            sender.clone(),
            content,
            self.context.now(),
            command.extra,
        );
        let room = self.context.rooms.touch(&room_id).await?;
        let delivered = self
            .context
            .broadcast(
                room.members_except(sender),
                &RelayEvent::Message(message.clone()),
            )
            .await;

        Ok(SentMessage {
            message,
            delivered,
            remaining,
        })
    }
}
