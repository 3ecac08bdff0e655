//! InMemory Room Registry 実装
//!
//! 全ルームを 1 つの Mutex で保護します。想定される競合は小さいため、
//! ルームごとのロックではなくグローバルロックで追加・削除・掃除を直列化します。

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use roomrelay_shared::time::Clock;

use crate::domain::{
    ConnectionId, MemberRemoval, RepositoryError, Room, RoomClosedReason, RoomClosure, RoomId,
    RoomRegistry, Timestamp,
};

/// インメモリ Room Registry 実装
pub struct InMemoryRoomRegistry {
    rooms: Mutex<HashMap<RoomId, Room>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRegistry {
    /// 新しい InMemoryRoomRegistry を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn create_or_get_room(&self, room_id: RoomId, creator: ConnectionId) -> Room {
        let now = self.now();
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room_id)
            .or_insert_with_key(|id| {
                tracing::info!("Room '{}' created by '{}'", id, creator);
                Room::new(id.clone(), creator, now)
            })
            .clone()
    }

    async fn add_member(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<Room, RepositoryError> {
        let now = self.now();
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        room.add_member(connection_id, now);
        Ok(room.clone())
    }

    async fn remove_member(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Result<MemberRemoval, RepositoryError> {
        let now = self.now();
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        let was_member = room.remove_member(connection_id, now);

        if was_member && room.should_close_after_departure(connection_id) {
            let room = rooms
                .remove(room_id)
                .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
            tracing::info!("Room '{}' closed: creator left", room_id);
            return Ok(MemberRemoval {
                room,
                was_member,
                closure: Some(RoomClosure {
                    room_id: room_id.clone(),
                    reason: RoomClosedReason::CreatorLeft,
                    closed_at: now,
                }),
            });
        }

        Ok(MemberRemoval {
            room: room.clone(),
            was_member,
            closure: None,
        })
    }

    async fn touch(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let now = self.now();
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        room.touch(now);
        Ok(room.clone())
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    async fn count_rooms(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.len()
    }

    async fn sweep_inactive(
        &self,
        inactivity_timeout: Duration,
        limit: usize,
    ) -> Vec<RoomClosure> {
        let now = self.now();
        let timeout_millis = inactivity_timeout.as_millis() as i64;
        let mut rooms = self.rooms.lock().await;

        let mut expired: Vec<RoomId> = rooms
            .values()
            .filter(|room| room.is_idle(now, timeout_millis))
            .map(|room| room.id.clone())
            .collect();
        expired.sort();

        expired
            .into_iter()
            .take(limit)
            .filter_map(|room_id| rooms.remove(&room_id))
            .map(|room| RoomClosure {
                room_id: room.id,
                reason: RoomClosedReason::Inactivity,
                closed_at: now,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomrelay_shared::time::ManualClock;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRoomRegistry のルーム作成・メンバー追加・削除・アイドル掃除
    //
    // 【なぜこのテストが必要か】
    // - ルームのライフサイクル（作成者退出による削除、アイドル削除）は
    //   クライアントから見える roomClosed 通知に直結する
    //
    // 【どのようなシナリオをテストするか】
    // 1. 先に作成した接続が作成者として残る
    // 2. メンバー追加の冪等性
    // 3. 作成者が最後に退出した場合の削除
    // 4. 作成者以外が最後に退出した場合は削除されない
    // 5. アイドルタイムアウトを超えた空ルームの掃除
    // 6. 1 回の掃除で削除する件数の上限
    // ========================================

    const HOUR_MILLIS: i64 = 3_600_000;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn create_test_registry() -> (InMemoryRoomRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (InMemoryRoomRegistry::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_first_creator_wins() {
        // テスト項目: 既存ルームの作成者は上書きされない
        // given (前提条件):
        let (registry, _clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("lobby"), conn("alice"))
            .await;

        // when (操作):
        let room = registry
            .create_or_get_room(room_id("lobby"), conn("bob"))
            .await;

        // then (期待する結果):
        assert_eq!(room.creator, conn("alice"));
        assert_eq!(registry.count_rooms().await, 1);
    }

    #[tokio::test]
    async fn test_add_member_twice_is_idempotent() {
        // テスト項目: 同じ接続を 2 回追加してもメンバー数は 1
        // given (前提条件):
        let (registry, _clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("lobby"), conn("alice"))
            .await;

        // when (操作):
        registry
            .add_member(&room_id("lobby"), conn("alice"))
            .await
            .unwrap();
        let room = registry
            .add_member(&room_id("lobby"), conn("alice"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.member_count(), 1);
    }

    #[tokio::test]
    async fn test_add_member_to_unknown_room() {
        // テスト項目: 存在しないルームへのメンバー追加はエラーになる
        // given (前提条件):
        let (registry, _clock) = create_test_registry();

        // when (操作):
        let result = registry.add_member(&room_id("ghost"), conn("alice")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::RoomNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_creator_leaving_last_closes_room() {
        // テスト項目: 作成者が最後のメンバーとして退出するとルームが削除される
        // given (前提条件):
        let (registry, _clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("lobby"), conn("alice"))
            .await;
        registry
            .add_member(&room_id("lobby"), conn("alice"))
            .await
            .unwrap();

        // when (操作):
        let removal = registry
            .remove_member(&room_id("lobby"), &conn("alice"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(removal.was_member);
        let closure = removal.closure.expect("room should be closed");
        assert_eq!(closure.reason, RoomClosedReason::CreatorLeft);
        assert!(registry.get_room(&room_id("lobby")).await.is_none());
    }

    #[tokio::test]
    async fn test_non_creator_leaving_last_keeps_room() {
        // テスト項目: 作成者以外が最後に退出してもルームは削除されない
        // given (前提条件):
        let (registry, _clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("lobby"), conn("alice"))
            .await;
        registry
            .add_member(&room_id("lobby"), conn("alice"))
            .await
            .unwrap();
        registry
            .add_member(&room_id("lobby"), conn("bob"))
            .await
            .unwrap();

        // when (操作): alice（作成者）→ bob の順に退出
        let first = registry
            .remove_member(&room_id("lobby"), &conn("alice"))
            .await
            .unwrap();
        let second = registry
            .remove_member(&room_id("lobby"), &conn("bob"))
            .await
            .unwrap();

        // then (期待する結果): 空のまま残り、アイドル掃除を待つ
        assert!(first.closure.is_none());
        assert_eq!(first.room.member_count(), 1);
        assert!(second.closure.is_none());
        let room = registry.get_room(&room_id("lobby")).await.unwrap();
        assert_eq!(room.member_count(), 0);
    }

    #[tokio::test]
    async fn test_removing_non_member_does_not_close() {
        // テスト項目: メンバーでない作成者の退出ではルームは削除されない
        // given (前提条件):
        let (registry, _clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("lobby"), conn("alice"))
            .await;

        // when (操作):
        let removal = registry
            .remove_member(&room_id("lobby"), &conn("alice"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!removal.was_member);
        assert!(removal.closure.is_none());
        assert_eq!(registry.count_rooms().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_empty_rooms() {
        // テスト項目: タイムアウトを超えた空ルームのみ掃除される
        // given (前提条件):
        let (registry, clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("empty"), conn("alice"))
            .await;
        registry
            .create_or_get_room(room_id("busy"), conn("bob"))
            .await;
        registry
            .add_member(&room_id("busy"), conn("bob"))
            .await
            .unwrap();

        // when (操作):
        clock.advance(HOUR_MILLIS + 1);
        let closed = registry.sweep_inactive(Duration::from_secs(3600), 16).await;

        // then (期待する結果):
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].room_id, room_id("empty"));
        assert_eq!(closed[0].reason, RoomClosedReason::Inactivity);
        assert!(registry.get_room(&room_id("busy")).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_keeps_recently_active_rooms() {
        // テスト項目: 最近アクティビティのあった空ルームは掃除されない
        // given (前提条件):
        let (registry, clock) = create_test_registry();
        registry
            .create_or_get_room(room_id("lobby"), conn("alice"))
            .await;
        clock.advance(HOUR_MILLIS - 10);
        registry.touch(&room_id("lobby")).await.unwrap();

        // when (操作):
        clock.advance(HOUR_MILLIS / 2);
        let closed = registry.sweep_inactive(Duration::from_secs(3600), 16).await;

        // then (期待する結果):
        assert!(closed.is_empty());
        assert_eq!(registry.count_rooms().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_at_most_limit_rooms_in_id_order() {
        // テスト項目: 1 回の掃除は上限件数までを ID 順に削除し、残りは次回に回る
        // given (前提条件):
        let (registry, clock) = create_test_registry();
        for id in ["delta", "alpha", "charlie", "bravo"] {
            registry.create_or_get_room(room_id(id), conn("alice")).await;
        }
        clock.advance(HOUR_MILLIS + 1);

        // when (操作):
        let first = registry.sweep_inactive(Duration::from_secs(3600), 3).await;
        let second = registry.sweep_inactive(Duration::from_secs(3600), 3).await;

        // then (期待する結果):
        let first: Vec<&str> = first.iter().map(|c| c.room_id.as_str()).collect();
        assert_eq!(first, vec!["alpha", "bravo", "charlie"]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].room_id, room_id("delta"));
        assert_eq!(registry.count_rooms().await, 0);
    }
}
