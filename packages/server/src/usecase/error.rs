//! UseCase 層のエラー型
//!
//! `Display` の文字列はそのまま ack の `error` としてクライアントに返されます。

use thiserror::Error;

use crate::domain::{RepositoryError, ValueObjectError};

/// 接続処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Connection '{0}' is already registered")]
    DuplicateConnection(String),
}

/// ルーム参加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error(transparent)]
    Validation(#[from] ValueObjectError),

    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error(transparent)]
    Validation(#[from] ValueObjectError),

    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 切断処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("Connection '{0}' is not connected")]
    NotConnected(String),
}
