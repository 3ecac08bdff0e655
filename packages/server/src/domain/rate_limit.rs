//! 接続ごとのレート制限
//!
//! ウィンドウごとにポイントを消費し、予算を超えた時点でブロック期間に入るポリシーです。
//! ブロック中はウィンドウがリセットされても全ての操作を拒否します。
//! `RateLimitRecord` は時刻を引数に取る純粋なロジックで、保管は Infrastructure 層が担います。

use std::time::Duration;

use async_trait::async_trait;

use super::ConnectionId;

/// Records untouched for this many windows are evictable
pub const STALE_AFTER_WINDOWS: u32 = 3;

/// レート制限の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// ウィンドウあたりのポイント数
    pub points: u32,
    /// ウィンドウの長さ
    pub window: Duration,
    /// 予算超過時のブロック期間
    pub block_duration: Duration,
}

impl RateLimitPolicy {
    fn window_millis(&self) -> i64 {
        self.window.as_millis() as i64
    }

    fn block_millis(&self) -> i64 {
        self.block_duration.as_millis() as i64
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            points: 50,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
        }
    }
}

/// 消費の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Rejected { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// ブロック状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockStatus {
    pub blocked: bool,
    pub seconds_remaining: u64,
}

/// 追跡中の接続ごとの状態（メトリクス用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub connection_id: ConnectionId,
    pub remaining: u32,
    pub block: BlockStatus,
}

/// 接続ごとのカウンタ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    consumed: u32,
    window_ends_at: i64,
    blocked_until: Option<i64>,
    last_seen: i64,
}

impl RateLimitRecord {
    pub fn new(now: i64, policy: &RateLimitPolicy) -> Self {
        Self {
            consumed: 0,
            window_ends_at: now + policy.window_millis(),
            blocked_until: None,
            last_seen: now,
        }
    }

    /// 1 ポイント消費を試みる
    pub fn consume(&mut self, now: i64, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.last_seen = now;
        self.roll_over(now, policy);

        if let Some(until) = self.blocked_until {
            return RateLimitDecision::Rejected {
                retry_after: millis_to_duration(until - now),
            };
        }

        self.consumed += 1;
        if self.consumed > policy.points {
            self.blocked_until = Some(now + policy.block_millis());
            return RateLimitDecision::Rejected {
                retry_after: policy.block_duration,
            };
        }

        RateLimitDecision::Allowed {
            remaining: policy.points - self.consumed,
        }
    }

    pub fn is_blocked(&self, now: i64) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    pub fn remaining(&self, now: i64, policy: &RateLimitPolicy) -> u32 {
        if self.is_blocked(now) {
            return 0;
        }
        if self.blocked_until.is_some() || now >= self.window_ends_at {
            return policy.points;
        }
        policy.points.saturating_sub(self.consumed)
    }

    pub fn block_status(&self, now: i64) -> BlockStatus {
        match self.blocked_until {
            Some(until) if now < until => BlockStatus {
                blocked: true,
                seconds_remaining: ((until - now) as u64).div_ceil(1000),
            },
            _ => BlockStatus::default(),
        }
    }

    /// ブロック中でなく、`STALE_AFTER_WINDOWS` ウィンドウ以上触れられていないか
    pub fn is_stale(&self, now: i64, policy: &RateLimitPolicy) -> bool {
        !self.is_blocked(now)
            && now - self.last_seen >= policy.window_millis() * i64::from(STALE_AFTER_WINDOWS)
    }

    // 期限切れのブロック・ウィンドウを新しいウィンドウに置き換える
    fn roll_over(&mut self, now: i64, policy: &RateLimitPolicy) {
        match self.blocked_until {
            Some(until) if now < until => {}
            Some(_) => *self = Self::new(now, policy),
            None if now >= self.window_ends_at => {
                self.consumed = 0;
                self.window_ends_at = now + policy.window_millis();
            }
            None => {}
        }
    }
}

fn millis_to_duration(millis: i64) -> Duration {
    Duration::from_millis(millis.max(0) as u64)
}

/// Rate Limiter trait
///
/// 接続 ID をキーにレート制限を管理します。
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// ブロック期間中か
    async fn is_limited(&self, connection_id: &ConnectionId) -> bool;

    /// 1 ポイント消費を試みる（レコードは初回に作成）
    async fn consume(&self, connection_id: &ConnectionId) -> RateLimitDecision;

    /// 現在のウィンドウの残りポイント
    async fn remaining(&self, connection_id: &ConnectionId) -> u32;

    async fn block_status(&self, connection_id: &ConnectionId) -> BlockStatus;

    /// レコードを削除（未知の ID でも安全）
    async fn remove(&self, connection_id: &ConnectionId);

    /// 古いレコードを削除し、削除した件数を返す
    async fn evict_stale(&self) -> usize;

    /// 追跡中の全接続の状態（ID 順）
    async fn statuses(&self) -> Vec<RateLimitStatus>;
}
