//! UseCase: 接続受付処理

use crate::domain::{Connection, ConnectionId, PusherChannel};

use super::{context::RelayContext, error::ConnectError};

/// 接続受付のユースケース
pub struct ConnectUseCase {
    context: RelayContext,
}

impl ConnectUseCase {
    pub fn new(context: RelayContext) -> Self {
        Self { context }
    }

    /// 新しい接続を登録
    ///
    /// # Arguments
    ///
    /// * `identity` - 接続時に渡された不透明なトークン（検証しない）
    /// * `sender` - この接続へのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// 割り当てた接続 ID を持つ `Connection`
    pub async fn execute(
        &self,
        identity: Option<String>,
        sender: PusherChannel,
    ) -> Result<Connection, ConnectError> {
        let _gate = self.context.gate.enter().await;

        let connection = Connection::new(ConnectionId::generate(), identity, self.context.now());
        self.context
            .connections
            .register(connection.clone())
            .await
            .map_err(|_| ConnectError::DuplicateConnection(connection.id.to_string()))?;
        self.context
            .message_pusher
            .register_client(connection.id.clone(), sender)
            .await;
        self.context.metrics.record_connect().await;

        Ok(connection)
    }
}
