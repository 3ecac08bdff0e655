//! UseCase: メトリクス取得

use std::sync::Arc;

use crate::domain::{
    MetricsCounters, MetricsRecorder, RateLimitStatus, RateLimiter, Room, RoomRegistry,
};

/// メトリクスのスナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsReport {
    pub counters: MetricsCounters,
    pub rooms: Vec<Room>,
    pub rate_limits: Vec<RateLimitStatus>,
}

/// メトリクス取得のユースケース
///
/// カウンタ・ルーム・レート制限の状態を読み取るだけで、何も変更しません。
pub struct GetMetricsUseCase {
    rooms: Arc<dyn RoomRegistry>,
    rate_limiter: Arc<dyn RateLimiter>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl GetMetricsUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRegistry>,
        rate_limiter: Arc<dyn RateLimiter>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            rooms,
            rate_limiter,
            metrics,
        }
    }

    pub async fn execute(&self) -> MetricsReport {
        MetricsReport {
            counters: self.metrics.snapshot().await,
            rooms: self.rooms.list_rooms().await,
            rate_limits: self.rate_limiter.statuses().await,
        }
    }
}
