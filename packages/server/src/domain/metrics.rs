//! メトリクス記録の trait 定義
//!
//! Connection Handler のイベントを受動的に記録します。読み取りはルームや接続の状態を変更しません。

use std::time::Duration;

use async_trait::async_trait;

use super::Timestamp;

/// Length of the sliding window used for per-minute rates
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// メトリクスのスナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsCounters {
    pub connected_clients: usize,
    pub total_connections: u64,
    pub total_messages: u64,
    pub total_errors: u64,
    /// 直近 60 秒のメッセージ数
    pub messages_per_minute: usize,
    /// 直近 60 秒のエラー数
    pub errors_per_minute: usize,
    pub active_rooms: usize,
    pub started_at: Timestamp,
    pub uptime: Duration,
}

#[async_trait]
pub trait MetricsRecorder: Send + Sync {
    async fn record_connect(&self);

    async fn record_disconnect(&self);

    async fn record_message(&self);

    async fn record_error(&self);

    async fn record_room_count(&self, active_rooms: usize);

    async fn snapshot(&self) -> MetricsCounters;
}
