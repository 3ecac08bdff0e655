//! エンティティ
//!
//! Room と Connection はそれぞれ識別子を持ち、状態遷移のルールを自身のメソッドで表現します。
//! 時刻は常に引数で受け取り、エンティティ自身は時計に依存しません。

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::value_object::{ConnectionId, MessageContent, RoomId, Timestamp};

/// ルームが閉じられた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomClosedReason {
    /// 一定時間メンバーがいなかった
    Inactivity,
    /// 作成者が最後のメンバーとして退出した
    CreatorLeft,
}

impl RoomClosedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactivity => "inactivity",
            Self::CreatorLeft => "creator-left",
        }
    }
}

/// ルームの削除記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomClosure {
    pub room_id: RoomId,
    pub reason: RoomClosedReason,
    pub closed_at: Timestamp,
}

/// リレー対象のルーム
///
/// 同じ ID のルームは最初に作成した接続が `creator` として記録され、以後上書きされません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub creator: ConnectionId,
    pub members: HashSet<ConnectionId>,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
}

impl Room {
    /// メンバーが空のルームを作成
    pub fn new(id: RoomId, creator: ConnectionId, now: Timestamp) -> Self {
        Self {
            id,
            creator,
            members: HashSet::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// メンバーを追加（冪等）
    ///
    /// 新規に追加された場合は `true` を返します。既存メンバーでも最終アクティビティは更新されます。
    pub fn add_member(&mut self, connection_id: ConnectionId, now: Timestamp) -> bool {
        self.touch(now);
        self.members.insert(connection_id)
    }

    /// メンバーを削除
    ///
    /// メンバーだった場合は `true` を返します。
    pub fn remove_member(&mut self, connection_id: &ConnectionId, now: Timestamp) -> bool {
        self.touch(now);
        self.members.remove(connection_id)
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.last_activity = self.last_activity.max(now);
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains(connection_id)
    }

    /// `departed` の退出直後にルームを削除すべきか
    ///
    /// メンバーが空になり、かつ退出したのが作成者である場合のみ削除対象です。
    /// 作成者以外が最後に退出した場合はアイドル掃除を待ちます。
    pub fn should_close_after_departure(&self, departed: &ConnectionId) -> bool {
        self.members.is_empty() && &self.creator == departed
    }

    /// メンバーがおらず、最終アクティビティから `timeout_millis` を超えているか
    pub fn is_idle(&self, now: Timestamp, timeout_millis: i64) -> bool {
        self.members.is_empty() && now.millis_since(self.last_activity) > timeout_millis
    }

    /// `exclude` 以外のメンバー（ID 順）
    pub fn members_except(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        let mut targets: Vec<ConnectionId> = self
            .members
            .iter()
            .filter(|id| *id != exclude)
            .cloned()
            .collect();
        targets.sort();
        targets
    }
}

/// `RoomRegistry::remove_member` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRemoval {
    /// 削除後のルームの状態（削除された場合は最後の状態）
    pub room: Room,
    /// 削除前にメンバーだったか
    pub was_member: bool,
    /// この退出でルームが閉じられた場合の記録
    pub closure: Option<RoomClosure>,
}

/// 接続の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Joined,
    Disconnected,
}

/// 1 本のクライアント接続
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    /// 接続時に渡された不透明な識別トークン（検証しない）
    pub identity: Option<String>,
    pub joined_rooms: HashSet<RoomId>,
    pub connected_at: Timestamp,
    pub state: ConnectionState,
}

impl Connection {
    pub fn new(id: ConnectionId, identity: Option<String>, connected_at: Timestamp) -> Self {
        Self {
            id,
            identity,
            joined_rooms: HashSet::new(),
            connected_at,
            state: ConnectionState::Connected,
        }
    }

    /// ルーム参加を記録（冪等）
    ///
    /// 切断済みの接続は状態を変えず `false` を返します。
    pub fn join(&mut self, room_id: RoomId) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::Joined;
        self.joined_rooms.insert(room_id)
    }

    /// 切断状態へ遷移し、参加していたルームを ID 順で返す
    pub fn disconnect(&mut self) -> Vec<RoomId> {
        self.state = ConnectionState::Disconnected;
        let mut rooms: Vec<RoomId> = self.joined_rooms.drain().collect();
        rooms.sort();
        rooms
    }
}

/// ファンアウトされるメッセージ
///
/// 永続化されず、リレー処理の間だけ存在します。
#[derive(Debug, Clone, PartialEq)]
pub struct RelayMessage {
    pub room_id: RoomId,
    pub sender: ConnectionId,
    pub content: MessageContent,
    /// サーバー側で付与した時刻（クライアント指定の時刻は使わない）
    pub timestamp: Timestamp,
    /// クライアントが付けたその他のフィールド（そのまま転送）
    pub extra: Map<String, Value>,
}

/// サーバーが値を決めるフィールド（クライアントの指定は転送しない）
pub const SERVER_OWNED_FIELDS: [&str; 6] = [
    "roomId",
    "content",
    "timestamp",
    "type",
    "requestId",
    "socketId",
];

impl RelayMessage {
    /// サーバー時刻を付けてメッセージを作成
    ///
    /// `extra` からはサーバーが値を決めるフィールドを取り除きます。
    pub fn new(
        room_id: RoomId,
        sender: ConnectionId,
        content: MessageContent,
        timestamp: Timestamp,
        mut extra: Map<String, Value>,
    ) -> Self {
        for key in SERVER_OWNED_FIELDS {
            extra.remove(key);
        }
        Self {
            room_id,
            sender,
            content,
            timestamp,
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn lobby() -> RoomId {
        RoomId::new("lobby".to_string()).unwrap()
    }

    #[test]
    fn test_relay_message_drops_server_owned_fields() {
        // テスト項目: クライアントが指定した timestamp 等は取り除かれ、その他は残る
        // given (前提条件):
        let mut extra = Map::new();
        extra.insert("timestamp".to_string(), Value::from("1999-01-01T00:00:00Z"));
        extra.insert("socketId".to_string(), Value::from("spoofed"));
        extra.insert("nickname".to_string(), Value::from("neko"));

        // when (操作):
        let message = RelayMessage::new(
            lobby(),
            conn("alice"),
            MessageContent::new("hi".to_string()).unwrap(),
            Timestamp::new(5_000),
            extra,
        );

        // then (期待する結果):
        assert_eq!(message.extra.len(), 1);
        assert_eq!(message.extra["nickname"], "neko");
        assert_eq!(message.timestamp, Timestamp::new(5_000));
    }

    #[test]
    fn test_add_member_is_idempotent() {
        // テスト項目: 同じ接続を 2 回追加してもメンバーは 1 人
        // given (前提条件):
        let mut room = Room::new(lobby(), conn("alice"), Timestamp::new(1_000));

        // when (操作):
        let first = room.add_member(conn("alice"), Timestamp::new(2_000));
        let second = room.add_member(conn("alice"), Timestamp::new(3_000));

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(room.member_count(), 1);
        assert_eq!(room.last_activity, Timestamp::new(3_000));
    }

    #[test]
    fn test_should_close_only_when_creator_leaves_last() {
        // テスト項目: 作成者が最後に退出した場合のみ削除対象になる
        // given (前提条件):
        let mut room = Room::new(lobby(), conn("alice"), Timestamp::new(0));
        room.add_member(conn("alice"), Timestamp::new(0));
        room.add_member(conn("bob"), Timestamp::new(0));

        // when (操作): alice が先に退出
        room.remove_member(&conn("alice"), Timestamp::new(10));
        let after_alice = room.should_close_after_departure(&conn("alice"));
        room.remove_member(&conn("bob"), Timestamp::new(20));
        let after_bob = room.should_close_after_departure(&conn("bob"));

        // then (期待する結果): どちらの退出でも削除対象にならない
        assert!(!after_alice);
        assert!(!after_bob);
        assert_eq!(room.member_count(), 0);
    }

    #[test]
    fn test_should_close_when_creator_is_sole_member() {
        // テスト項目: 作成者のみのルームで作成者が退出すると削除対象になる
        // given (前提条件):
        let mut room = Room::new(lobby(), conn("alice"), Timestamp::new(0));
        room.add_member(conn("alice"), Timestamp::new(0));

        // when (操作):
        room.remove_member(&conn("alice"), Timestamp::new(10));

        // then (期待する結果):
        assert!(room.should_close_after_departure(&conn("alice")));
    }

    #[test]
    fn test_is_idle_requires_empty_room() {
        // テスト項目: メンバーがいるルームはタイムアウトを過ぎてもアイドル扱いにならない
        // given (前提条件):
        let mut room = Room::new(lobby(), conn("alice"), Timestamp::new(0));
        room.add_member(conn("bob"), Timestamp::new(0));

        // when (操作):
        let idle = room.is_idle(Timestamp::new(10_000), 1_000);

        // then (期待する結果):
        assert!(!idle);
    }

    #[test]
    fn test_is_idle_after_timeout() {
        // テスト項目: 空のルームはタイムアウトを超えるとアイドル扱いになる
        // given (前提条件):
        let room = Room::new(lobby(), conn("alice"), Timestamp::new(0));

        // when (操作):
        let at_limit = room.is_idle(Timestamp::new(1_000), 1_000);
        let past_limit = room.is_idle(Timestamp::new(1_001), 1_000);

        // then (期待する結果):
        assert!(!at_limit);
        assert!(past_limit);
    }

    #[test]
    fn test_members_except_excludes_and_sorts() {
        // テスト項目: 指定した接続を除外したメンバーが ID 順で返される
        // given (前提条件):
        let mut room = Room::new(lobby(), conn("alice"), Timestamp::new(0));
        room.add_member(conn("charlie"), Timestamp::new(0));
        room.add_member(conn("alice"), Timestamp::new(0));
        room.add_member(conn("bob"), Timestamp::new(0));

        // when (操作):
        let targets = room.members_except(&conn("alice"));

        // then (期待する結果):
        assert_eq!(targets, vec![conn("bob"), conn("charlie")]);
    }

    #[test]
    fn test_connection_state_transitions() {
        // テスト項目: Connection は connected → joined → disconnected と遷移する
        // given (前提条件):
        let mut connection = Connection::new(conn("alice"), None, Timestamp::new(0));
        assert_eq!(connection.state, ConnectionState::Connected);

        // when (操作):
        connection.join(lobby());
        let joined_state = connection.state;
        let left = connection.disconnect();

        // then (期待する結果):
        assert_eq!(joined_state, ConnectionState::Joined);
        assert_eq!(connection.state, ConnectionState::Disconnected);
        assert_eq!(left, vec![lobby()]);
        assert!(!connection.join(lobby()));
    }
}
