//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 実装は各メソッドを 1 回のロック取得の中で完結させ、
//! 追加・削除・掃除が互いに線形化可能であることを保証しなければなりません。

use std::time::Duration;

use async_trait::async_trait;

use super::{
    Connection, ConnectionId, MemberRemoval, RepositoryError, Room, RoomClosure, RoomId,
};

/// Room Registry trait
///
/// ルーム ID からルーム状態への対応を管理し、ルームの作成・期限切れ・削除を担います。
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// ルームを取得、なければ作成
    ///
    /// 既存のルームの作成者は上書きしません（先に作成した接続が勝つ）。
    async fn create_or_get_room(&self, room_id: RoomId, creator: ConnectionId) -> Room;

    /// メンバーを追加（冪等）し、最終アクティビティを更新
    async fn add_member(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<Room, RepositoryError>;

    /// メンバーを削除し、最終アクティビティを更新
    ///
    /// 削除後にメンバーが空で、退出したのが作成者であればルームも削除します。
    async fn remove_member(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Result<MemberRemoval, RepositoryError>;

    /// 最終アクティビティを更新
    async fn touch(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// ルームを取得
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// 全ルームを取得（ID 順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// ルーム数を取得
    async fn count_rooms(&self) -> usize;

    /// メンバーが空で `inactivity_timeout` を超えてアクティビティのないルームを、
    /// ID 順に最大 `limit` 件削除
    async fn sweep_inactive(&self, inactivity_timeout: Duration, limit: usize)
    -> Vec<RoomClosure>;
}

/// Connection Repository trait
///
/// 接続中のクライアントと、それぞれが参加しているルームを管理します。
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 接続を登録
    async fn register(&self, connection: Connection) -> Result<(), RepositoryError>;

    /// ルーム参加を記録（新規参加なら `true`）
    async fn record_join(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, RepositoryError>;

    /// 接続を取得
    async fn get(&self, connection_id: &ConnectionId) -> Option<Connection>;

    /// 接続を削除し、削除した接続を返す
    async fn remove(&self, connection_id: &ConnectionId) -> Option<Connection>;

    /// 接続中の全ての接続 ID を取得（ID 順）
    async fn all_ids(&self) -> Vec<ConnectionId>;

    /// 接続数を取得
    async fn count(&self) -> usize;
}
