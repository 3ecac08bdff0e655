//! Server state shared by every handler.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{config::RelayConfig, domain::MessagePusher, usecase::RelayUseCases};

/// Shared application state
pub struct AppState {
    /// UseCase 群（Connection Handler の各操作）
    pub usecases: RelayUseCases,
    /// MessagePusher（ack の直接送信に使用）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub config: RelayConfig,
    /// シャットダウン開始で `true` になる
    pub shutdown: watch::Receiver<bool>,
}
