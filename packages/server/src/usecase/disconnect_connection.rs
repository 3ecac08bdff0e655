//! UseCase: 切断処理
//!
//! 正常なクローズだけでなく、ネットワーク障害やハートビートのタイムアウトでも同じ後始末を行います。

use crate::domain::{ConnectionId, RelayEvent, RoomClosure, RoomId};

use super::{context::RelayContext, error::DisconnectError};

/// 切断処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// 退出したルームと、退出後のメンバー数
    pub left_rooms: Vec<(RoomId, usize)>,
    /// この切断で閉じられたルーム
    pub closed_rooms: Vec<RoomClosure>,
}

/// 切断処理のユースケース
pub struct DisconnectUseCase {
    context: RelayContext,
}

impl DisconnectUseCase {
    pub fn new(context: RelayContext) -> Self {
        Self { context }
    }

    /// 切断を処理
    ///
    /// 参加していた全ルームから退出させ、残ったメンバーに `userLeft` を配信します。
    /// 作成者が最後のメンバーとして退出したルームは削除され、全接続に `roomClosed` を配信します。
    /// レート制限の記録と送信チャンネルは、接続が見つからない場合も解放します。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<DisconnectOutcome, DisconnectError> {
        let _gate = self.context.gate.enter().await;

        self.context.rate_limiter.remove(connection_id).await;
        self.context
            .message_pusher
            .unregister_client(connection_id)
            .await;

        let Some(mut connection) = self.context.connections.remove(connection_id).await else {
            tracing::debug!("Disconnect for unknown connection '{}'", connection_id);
            return Err(DisconnectError::NotConnected(connection_id.to_string()));
        };

        let mut outcome = DisconnectOutcome::default();
        for room_id in connection.disconnect() {
            let removal = match self
                .context
                .rooms
                .remove_member(&room_id, connection_id)
                .await
            {
                Ok(removal) => removal,
                Err(e) => {
                    tracing::debug!("Skipping room on disconnect: {}", e);
                    continue;
                }
            };
            if !removal.was_member {
                continue;
            }

            let member_count = removal.room.member_count();
            let event = RelayEvent::UserLeft {
                room_id: room_id.clone(),
                connection_id: connection_id.clone(),
                member_count,
                timestamp: self.context.now(),
            };
            let mut remaining: Vec<ConnectionId> = removal.room.members.iter().cloned().collect();
            remaining.sort();
            self.context.broadcast(remaining, &event).await;

            outcome.left_rooms.push((room_id, member_count));
            if let Some(closure) = removal.closure {
                outcome.closed_rooms.push(closure);
            }
        }

        if !outcome.closed_rooms.is_empty() {
            let everyone = self.context.connections.all_ids().await;
            for closure in &outcome.closed_rooms {
                self.context
                    .broadcast(everyone.clone(), &RelayEvent::RoomClosed(closure.clone()))
                    .await;
            }
        }

        self.context.metrics.record_disconnect().await;
        let room_count = self.context.rooms.count_rooms().await;
        self.context.metrics.record_room_count(room_count).await;

        tracing::info!(
            "'{}' disconnected (left {} rooms, closed {})",
            connection_id,
            outcome.left_rooms.len(),
            outcome.closed_rooms.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomClosedReason;
    use crate::usecase::context::test_support::{TestRelay, conn, drain};
    use crate::usecase::{JoinRoomUseCase, SendMessageCommand, SendMessageUseCase};

    fn lobby() -> RoomId {
        RoomId::new("lobby".to_string()).unwrap()
    }

    async fn join(relay: &TestRelay, id: &str, room_id: &str) {
        JoinRoomUseCase::new(relay.context.clone())
            .execute(&conn(id), Some(room_id.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_members() {
        // テスト項目: 残ったメンバーに userLeft が更新後のメンバー数付きで届く
        // given (前提条件):
        let relay = TestRelay::new();
        let _alice_rx = relay.connect("alice").await;
        let mut bob_rx = relay.connect("bob").await;
        join(&relay, "alice", "lobby").await;
        join(&relay, "bob", "lobby").await;
        let usecase = DisconnectUseCase::new(relay.context.clone());

        // when (操作):
        let outcome = usecase.execute(&conn("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.left_rooms, vec![(lobby(), 1)]);
        assert!(outcome.closed_rooms.is_empty());

        let frames = drain(&mut bob_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "userLeft");
        assert_eq!(frames[0]["socketId"], "alice");
        assert_eq!(frames[0]["memberCount"], 1);

        // 作成者は退出したが、bob が残っているのでルームは残る
        let room = relay.context.rooms.get_room(&lobby()).await.unwrap();
        assert_eq!(room.creator, conn("alice"));
        assert!(room.is_member(&conn("bob")));
    }

    #[tokio::test]
    async fn test_creator_leaving_last_closes_room() {
        // テスト項目: 作成者が最後のメンバーとして退出するとルームが閉じられ、全接続に roomClosed が届く
        // given (前提条件):
        let relay = TestRelay::new();
        let _alice_rx = relay.connect("alice").await;
        let mut bob_rx = relay.connect("bob").await;
        join(&relay, "alice", "lobby").await;
        join(&relay, "bob", "elsewhere").await;
        let usecase = DisconnectUseCase::new(relay.context.clone());

        // when (操作):
        let outcome = usecase.execute(&conn("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.closed_rooms.len(), 1);
        assert_eq!(outcome.closed_rooms[0].reason, RoomClosedReason::CreatorLeft);
        assert!(relay.context.rooms.get_room(&lobby()).await.is_none());

        let frames = drain(&mut bob_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "roomClosed");
        assert_eq!(frames[0]["roomId"], "lobby");
        assert_eq!(frames[0]["reason"], "creator-left");
    }

    #[tokio::test]
    async fn test_last_non_creator_leaving_keeps_room() {
        // テスト項目: 作成者以外が最後に退出した場合、空のルームは削除されずアイドル掃除を待つ
        // given (前提条件):
        let relay = TestRelay::new();
        let _alice_rx = relay.connect("alice").await;
        let _bob_rx = relay.connect("bob").await;
        join(&relay, "alice", "lobby").await;
        join(&relay, "bob", "lobby").await;
        let usecase = DisconnectUseCase::new(relay.context.clone());
        usecase.execute(&conn("alice")).await.unwrap();

        // when (操作):
        let outcome = usecase.execute(&conn("bob")).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.left_rooms, vec![(lobby(), 0)]);
        assert!(outcome.closed_rooms.is_empty());
        let room = relay.context.rooms.get_room(&lobby()).await.unwrap();
        assert_eq!(room.member_count(), 0);
        assert_eq!(relay.context.metrics.snapshot().await.active_rooms, 1);
    }

    #[tokio::test]
    async fn test_disconnect_releases_rate_limit_and_connection() {
        // テスト項目: 切断でレート制限の記録と接続の登録が解放される
        // given (前提条件):
        let relay = TestRelay::new();
        let _alice_rx = relay.connect("alice").await;
        join(&relay, "alice", "lobby").await;
        SendMessageUseCase::new(relay.context.clone())
            .execute(
                &conn("alice"),
                SendMessageCommand {
                    room_id: Some("lobby".to_string()),
                    content: Some("bye".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(relay.rate_limiter.tracked().await, 1);
        let usecase = DisconnectUseCase::new(relay.context.clone());

        // when (操作):
        usecase.execute(&conn("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(relay.rate_limiter.tracked().await, 0);
        assert_eq!(relay.context.connections.count().await, 0);
        assert_eq!(relay.context.metrics.snapshot().await.connected_clients, 0);
        assert!(
            relay
                .context
                .message_pusher
                .push_to(&conn("alice"), "late")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_disconnect_unknown_connection() {
        // テスト項目: 登録されていない接続の切断はエラーを返すが、何も壊さない
        // given (前提条件):
        let relay = TestRelay::new();
        let usecase = DisconnectUseCase::new(relay.context.clone());

        // when (操作):
        let result = usecase.execute(&conn("ghost")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DisconnectError::NotConnected("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_disconnect_leaves_every_joined_room() {
        // テスト項目: 参加していた全てのルームから退出する
        // given (前提条件):
        let relay = TestRelay::new();
        let _alice_rx = relay.connect("alice").await;
        let _bob_rx = relay.connect("bob").await;
        for room in ["a", "b", "c"] {
            join(&relay, "alice", room).await;
            join(&relay, "bob", room).await;
        }
        let usecase = DisconnectUseCase::new(relay.context.clone());

        // when (操作):
        let outcome = usecase.execute(&conn("bob")).await.unwrap();

        // then (期待する結果):
        let left: Vec<&str> = outcome
            .left_rooms
            .iter()
            .map(|(room_id, _)| room_id.as_str())
            .collect();
        assert_eq!(left, vec!["a", "b", "c"]);
        for (_, count) in &outcome.left_rooms {
            assert_eq!(*count, 1);
        }
    }
}
