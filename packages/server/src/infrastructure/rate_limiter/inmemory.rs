//! InMemory RateLimiter 実装
//!
//! 接続 ID ごとの `RateLimitRecord` を HashMap で保持します。
//! レコードは初回の消費時に作成され、切断時の `remove` か `evict_stale` で解放されます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use roomrelay_shared::time::Clock;

use crate::domain::{
    BlockStatus, ConnectionId, RateLimitDecision, RateLimitPolicy, RateLimitRecord,
    RateLimitStatus, RateLimiter,
};

/// インメモリ RateLimiter 実装
pub struct InMemoryRateLimiter {
    policy: RateLimitPolicy,
    records: Mutex<HashMap<ConnectionId, RateLimitRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// 追跡中のレコード数
    pub async fn tracked(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn is_limited(&self, connection_id: &ConnectionId) -> bool {
        let now = self.clock.now_millis();
        let records = self.records.lock().await;
        records
            .get(connection_id)
            .is_some_and(|record| record.is_blocked(now))
    }

    async fn consume(&self, connection_id: &ConnectionId) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;
        let record = records
            .entry(connection_id.clone())
            .or_insert_with(|| RateLimitRecord::new(now, &self.policy));
        let decision = record.consume(now, &self.policy);
        if let RateLimitDecision::Rejected { retry_after } = decision {
            tracing::debug!(
                "Rate limit rejected '{}' (retry after {}s)",
                connection_id,
                retry_after.as_secs()
            );
        }
        decision
    }

    async fn remaining(&self, connection_id: &ConnectionId) -> u32 {
        let now = self.clock.now_millis();
        let records = self.records.lock().await;
        records
            .get(connection_id)
            .map_or(self.policy.points, |record| {
                record.remaining(now, &self.policy)
            })
    }

    async fn block_status(&self, connection_id: &ConnectionId) -> BlockStatus {
        let now = self.clock.now_millis();
        let records = self.records.lock().await;
        records
            .get(connection_id)
            .map(|record| record.block_status(now))
            .unwrap_or_default()
    }

    async fn remove(&self, connection_id: &ConnectionId) {
        let mut records = self.records.lock().await;
        records.remove(connection_id);
    }

    async fn evict_stale(&self) -> usize {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| !record.is_stale(now, &self.policy));
        before - records.len()
    }

    async fn statuses(&self) -> Vec<RateLimitStatus> {
        let now = self.clock.now_millis();
        let records = self.records.lock().await;
        let mut statuses: Vec<RateLimitStatus> = records
            .iter()
            .map(|(connection_id, record)| RateLimitStatus {
                connection_id: connection_id.clone(),
                remaining: record.remaining(now, &self.policy),
                block: record.block_status(now),
            })
            .collect();
        statuses.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        statuses
    }
}
