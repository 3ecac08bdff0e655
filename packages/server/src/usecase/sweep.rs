//! UseCase: 定期的な掃除処理
//!
//! アイドル状態のルームの削除と、使われなくなったレート制限記録の破棄を行います。

use std::time::Duration;

use crate::domain::{RelayEvent, RoomClosure};

use super::context::RelayContext;

/// 1 回のゲート保持で削除するルームの上限
pub const ROOM_SWEEP_BATCH_SIZE: usize = 64;

/// 掃除のユースケース
pub struct SweepUseCase {
    context: RelayContext,
    room_inactivity_timeout: Duration,
    batch_size: usize,
}

impl SweepUseCase {
    pub fn new(context: RelayContext, room_inactivity_timeout: Duration) -> Self {
        Self {
            context,
            room_inactivity_timeout,
            batch_size: ROOM_SWEEP_BATCH_SIZE,
        }
    }

    /// 1 バッチで削除するルーム数を変更（0 は 1 として扱う）
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// メンバーが空でアイドル時間を超えたルームを削除し、全接続に `roomClosed` を配信
    ///
    /// バッチごとにゲートを解放するため、大量のルームを閉じる間も他のイベントが処理されます。
    pub async fn sweep_inactive_rooms(&self) -> Vec<RoomClosure> {
        let mut closures = Vec::new();
        loop {
            let batch = self.sweep_batch().await;
            let exhausted = batch.len() < self.batch_size;
            closures.extend(batch);
            if exhausted {
                return closures;
            }
            tokio::task::yield_now().await;
        }
    }

    async fn sweep_batch(&self) -> Vec<RoomClosure> {
        let _gate = self.context.gate.enter().await;

        let closures = self
            .context
            .rooms
            .sweep_inactive(self.room_inactivity_timeout, self.batch_size)
            .await;
        if closures.is_empty() {
            return closures;
        }

        let everyone = self.context.connections.all_ids().await;
        for closure in &closures {
            tracing::info!("Room '{}' closed: inactivity", closure.room_id);
            self.context
                .broadcast(everyone.clone(), &RelayEvent::RoomClosed(closure.clone()))
                .await;
        }

        let room_count = self.context.rooms.count_rooms().await;
        self.context.metrics.record_room_count(room_count).await;
        closures
    }

    /// 古いレート制限記録を破棄し、破棄した数を返す
    pub async fn evict_stale_rate_limits(&self) -> usize {
        let _gate = self.context.gate.enter().await;

        let evicted = self.context.rate_limiter.evict_stale().await;
        if evicted > 0 {
            tracing::debug!("Evicted {} stale rate limit records", evicted);
        }
        evicted
    }
}
