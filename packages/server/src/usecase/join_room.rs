//! UseCase: ルーム参加処理

use crate::domain::{
    ConnectionId, RateLimitDecision, RelayEvent, RepositoryError, Room, RoomId,
};

use super::{context::RelayContext, error::JoinRoomError};

/// ルーム参加の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// 参加後のルーム
    pub room: Room,
    /// 今回初めて参加したか（同じルームへの再参加なら `false`）
    pub newly_joined: bool,
    /// 今回の参加でルームが作成されたか
    pub created: bool,
    /// 現在のウィンドウで残っているポイント
    pub remaining: u32,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    context: RelayContext,
}

impl JoinRoomUseCase {
    pub fn new(context: RelayContext) -> Self {
        Self { context }
    }

    /// ルームに参加
    ///
    /// 検証 → レート制限 → 登録の順に処理し、検証やレート制限で拒否された場合は状態を変更しません。
    /// 新規参加の場合は、参加者以外のメンバーへ `userJoined` を配信します。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: Option<String>,
    ) -> Result<JoinOutcome, JoinRoomError> {
        let _gate = self.context.gate.enter().await;

        let result = self.join(connection_id, room_id).await;
        if let Err(e) = &result {
            tracing::warn!("Join rejected for '{}': {}", connection_id, e);
            self.context.metrics.record_error().await;
        }
        result
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: Option<String>,
    ) -> Result<JoinOutcome, JoinRoomError> {
        let room_id = RoomId::new(room_id.unwrap_or_default())?;

        let remaining = match self.context.rate_limiter.consume(connection_id).await {
            RateLimitDecision::Allowed { remaining } => remaining,
            RateLimitDecision::Rejected { retry_after } => {
                return Err(JoinRoomError::RateLimited {
                    retry_after_secs: retry_after.as_millis().div_ceil(1000) as u64,
                });
            }
        };

        if self.context.connections.get(connection_id).await.is_none() {
            return Err(RepositoryError::ConnectionNotFound(connection_id.to_string()).into());
        }

        let created = self.context.rooms.get_room(&room_id).await.is_none();
        self.context
            .rooms
            .create_or_get_room(room_id.clone(), connection_id.clone())
            .await;
        let room = self
            .context
            .rooms
            .add_member(&room_id, connection_id.clone())
            .await?;
        let newly_joined = self
            .context
            .connections
            .record_join(connection_id, room_id.clone())
            .await?;

        if newly_joined {
            let event = RelayEvent::UserJoined {
                room_id: room_id.clone(),
                connection_id: connection_id.clone(),
                member_count: room.member_count(),
                timestamp: self.context.now(),
            };
            let delivered = self
                .context
                .broadcast(room.members_except(connection_id), &event)
                .await;
            tracing::info!(
                "'{}' joined room '{}' ({} members, notified {})",
                connection_id,
                room_id,
                room.member_count(),
                delivered
            );
        } else {
            tracing::debug!("'{}' re-joined room '{}'", connection_id, room_id);
        }

        let room_count = self.context.rooms.count_rooms().await;
        self.context.metrics.record_room_count(room_count).await;

        Ok(JoinOutcome {
            room,
            newly_joined,
            created,
            remaining,
        })
    }
}
