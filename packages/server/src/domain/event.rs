//! ルームメンバーへ非同期に通知されるイベント

use super::{
    entity::{RelayMessage, RoomClosure},
    value_object::{ConnectionId, RoomId, Timestamp},
};

/// ブロードキャストされるイベント
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// 接続がルームに参加した
    UserJoined {
        room_id: RoomId,
        connection_id: ConnectionId,
        member_count: usize,
        timestamp: Timestamp,
    },
    /// 接続がルームから離れた（切断）
    UserLeft {
        room_id: RoomId,
        connection_id: ConnectionId,
        member_count: usize,
        timestamp: Timestamp,
    },
    /// ルームへのメッセージ
    Message(RelayMessage),
    /// ルームが閉じられた
    RoomClosed(RoomClosure),
}
