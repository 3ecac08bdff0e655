//! InMemory MetricsRecorder 実装
//!
//! 通算カウンタと、直近のイベント時刻のリストを保持します。
//! 時刻リストは記録時と読み取り時の両方で直近 60 秒に切り詰めてからレートを計算します。

use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use roomrelay_shared::time::Clock;

use crate::domain::{
    MetricsCounters, MetricsRecorder, Timestamp,
    metrics::RATE_WINDOW,
};

#[derive(Debug, Default)]
struct MetricsState {
    connected_clients: usize,
    total_connections: u64,
    total_messages: u64,
    total_errors: u64,
    active_rooms: usize,
    recent_messages: VecDeque<i64>,
    recent_errors: VecDeque<i64>,
}

impl MetricsState {
    fn trim(&mut self, now: i64) {
        trim_window(&mut self.recent_messages, now);
        trim_window(&mut self.recent_errors, now);
    }
}

/// `now` から 60 秒より前のイベント時刻を取り除く
fn trim_window(events: &mut VecDeque<i64>, now: i64) {
    let window = RATE_WINDOW.as_millis() as i64;
    while events.front().is_some_and(|&at| now - at >= window) {
        events.pop_front();
    }
}

/// インメモリ MetricsRecorder 実装
pub struct InMemoryMetricsRecorder {
    state: Mutex<MetricsState>,
    started_at: i64,
    clock: Arc<dyn Clock>,
}

impl InMemoryMetricsRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MetricsState::default()),
            started_at: clock.now_millis(),
            clock,
        }
    }
}

#[async_trait]
impl MetricsRecorder for InMemoryMetricsRecorder {
    async fn record_connect(&self) {
        let mut state = self.state.lock().await;
        state.connected_clients += 1;
        state.total_connections += 1;
    }

    async fn record_disconnect(&self) {
        let mut state = self.state.lock().await;
        state.connected_clients = state.connected_clients.saturating_sub(1);
    }

    async fn record_message(&self) {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;
        state.total_messages += 1;
        state.recent_messages.push_back(now);
        state.trim(now);
    }

    async fn record_error(&self) {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;
        state.total_errors += 1;
        state.recent_errors.push_back(now);
        state.trim(now);
    }

    async fn record_room_count(&self, active_rooms: usize) {
        let mut state = self.state.lock().await;
        state.active_rooms = active_rooms;
    }

    async fn snapshot(&self) -> MetricsCounters {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;
        state.trim(now);
        MetricsCounters {
            connected_clients: state.connected_clients,
            total_connections: state.total_connections,
            total_messages: state.total_messages,
            total_errors: state.total_errors,
            messages_per_minute: state.recent_messages.len(),
            errors_per_minute: state.recent_errors.len(),
            active_rooms: state.active_rooms,
            started_at: Timestamp::new(self.started_at),
            uptime: Duration::from_millis((now - self.started_at).max(0) as u64),
        }
    }
}
