//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Connection ID must not be empty")]
    EmptyConnectionId,

    #[error("Room ID is required")]
    EmptyRoomId,

    #[error("Room ID must be at most {max} characters")]
    RoomIdTooLong { max: usize },

    #[error("Message content is required")]
    EmptyMessageContent,

    #[error("Message content must be at most {max} characters")]
    MessageContentTooLong { max: usize },
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Connection '{0}' is already registered")]
    DuplicateConnection(String),

    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),

    #[error("Client '{0}' is not keeping up and was evicted")]
    SlowConsumer(String),

    #[error("Failed to encode event: {0}")]
    Encode(String),
}
