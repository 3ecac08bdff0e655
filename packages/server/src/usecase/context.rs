//! ユースケースが共有する依存関係

use std::{sync::Arc, time::Duration};

use roomrelay_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRepository, MessagePusher, MetricsRecorder, RateLimiter, RelayEvent,
    RoomRegistry, Timestamp,
};

use super::{
    ConnectUseCase, DisconnectUseCase, EventGate, GetHealthUseCase, GetMetricsUseCase,
    JoinRoomUseCase, ReportErrorUseCase, SendMessageUseCase, SweepUseCase,
};

/// Connection Handler の共有状態と能力
///
/// 共有状態（ルーム・接続・レート制限）の変更は、全てゲートを通ったユースケースの中で行われます。
#[derive(Clone)]
pub struct RelayContext {
    pub rooms: Arc<dyn RoomRegistry>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub message_pusher: Arc<dyn MessagePusher>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub gate: Arc<EventGate>,
    pub clock: Arc<dyn Clock>,
}

impl RelayContext {
    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// イベントを配信し、届いた接続数を返す
    ///
    /// 配信の失敗は呼び出し元の操作を失敗させません。
    pub(crate) async fn broadcast(&self, targets: Vec<ConnectionId>, event: &RelayEvent) -> usize {
        match self.message_pusher.broadcast(targets, event).await {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::warn!("Failed to broadcast event: {}", e);
                0
            }
        }
    }
}

/// サーバーが使う全ユースケース
#[derive(Clone)]
pub struct RelayUseCases {
    pub connect: Arc<ConnectUseCase>,
    pub join_room: Arc<JoinRoomUseCase>,
    pub send_message: Arc<SendMessageUseCase>,
    pub disconnect: Arc<DisconnectUseCase>,
    pub sweep: Arc<SweepUseCase>,
    pub get_health: Arc<GetHealthUseCase>,
    pub get_metrics: Arc<GetMetricsUseCase>,
    pub report_error: Arc<ReportErrorUseCase>,
}

impl RelayUseCases {
    /// 全ユースケースを同じコンテキストから作成
    pub fn new(context: RelayContext, room_inactivity_timeout: Duration) -> Self {
        Self {
            connect: Arc::new(ConnectUseCase::new(context.clone())),
            join_room: Arc::new(JoinRoomUseCase::new(context.clone())),
            send_message: Arc::new(SendMessageUseCase::new(context.clone())),
            disconnect: Arc::new(DisconnectUseCase::new(context.clone())),
            sweep: Arc::new(SweepUseCase::new(
                context.clone(),
                room_inactivity_timeout,
            )),
            get_health: Arc::new(GetHealthUseCase::new(context.rooms.clone())),
            report_error: Arc::new(ReportErrorUseCase::new(context.metrics.clone())),
            get_metrics: Arc::new(GetMetricsUseCase::new(
                context.rooms,
                context.rate_limiter,
                context.metrics,
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! ユースケースのテスト用にインメモリ実装を組み立てるヘルパー

    use std::sync::Arc;

    use roomrelay_shared::time::ManualClock;
    use serde_json::Value;

    use super::*;
    use crate::{
        domain::{Connection, ConnectionId, PusherReceiver, RateLimitPolicy, pusher_channel},
        infrastructure::{
            message_pusher::WebSocketMessagePusher,
            metrics::InMemoryMetricsRecorder,
            rate_limiter::InMemoryRateLimiter,
            repository::{InMemoryConnectionRepository, InMemoryRoomRegistry},
        },
    };

    pub const START_MILLIS: i64 = 1_672_531_200_000;

    pub struct TestRelay {
        pub context: RelayContext,
        pub clock: Arc<ManualClock>,
        pub rooms: Arc<InMemoryRoomRegistry>,
        pub connections: Arc<InMemoryConnectionRepository>,
        pub rate_limiter: Arc<InMemoryRateLimiter>,
        pub metrics: Arc<InMemoryMetricsRecorder>,
    }

    impl TestRelay {
        pub fn new() -> Self {
            Self::with_policy(RateLimitPolicy::default())
        }

        pub fn with_policy(policy: RateLimitPolicy) -> Self {
            let clock = Arc::new(ManualClock::new(START_MILLIS));
            let rooms = Arc::new(InMemoryRoomRegistry::new(clock.clone()));
            let connections = Arc::new(InMemoryConnectionRepository::new());
            let rate_limiter = Arc::new(InMemoryRateLimiter::new(policy, clock.clone()));
            let metrics = Arc::new(InMemoryMetricsRecorder::new(clock.clone()));
            let context = RelayContext {
                rooms: rooms.clone(),
                connections: connections.clone(),
                rate_limiter: rate_limiter.clone(),
                message_pusher: Arc::new(WebSocketMessagePusher::new()),
                metrics: metrics.clone(),
                gate: Arc::new(EventGate::new()),
                clock: clock.clone(),
            };
            Self {
                context,
                clock,
                rooms,
                connections,
                rate_limiter,
                metrics,
            }
        }

        /// 指定した ID で接続を登録し、その接続の受信チャンネルを返す
        pub async fn connect(&self, id: &str) -> PusherReceiver {
            let (tx, rx) = pusher_channel(256);
            let connection_id = conn(id);
            self.context
                .connections
                .register(Connection::new(connection_id.clone(), None, self.context.now()))
                .await
                .unwrap();
            self.context
                .message_pusher
                .register_client(connection_id, tx)
                .await;
            self.context.metrics.record_connect().await;
            rx
        }
    }

    pub fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    /// 受信済みのフレームを全て取り出して JSON として返す
    pub fn drain(rx: &mut PusherReceiver) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = rx.messages.try_recv() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }
}
