//! ドメイン層
//!
//! ルーム・接続・メッセージのモデルと、それらに対する純粋なルール、
//! そしてドメイン層が必要とするインターフェース（trait）を定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod metrics;
pub mod rate_limit;
pub mod repository;
pub mod value_object;

pub use entity::{
    Connection, ConnectionState, MemberRemoval, RelayMessage, Room, RoomClosedReason, RoomClosure,
};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use event::RelayEvent;
pub use message_pusher::{MessagePusher, PusherChannel, PusherReceiver, pusher_channel};
pub use metrics::{MetricsCounters, MetricsRecorder};
pub use rate_limit::{
    BlockStatus, RateLimitDecision, RateLimitPolicy, RateLimitRecord, RateLimitStatus, RateLimiter,
};
pub use repository::{ConnectionRepository, RoomRegistry};
pub use value_object::{ConnectionId, MessageContent, RoomId, Timestamp};
