//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, http::HeaderValue, routing::get};
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::{ANY_ORIGIN, RelayConfig},
    domain::MessagePusher,
    usecase::{RelayUseCases, SweepUseCase},
};

use super::{
    handler::{health_check, metrics, websocket_handler},
    signal::{shutdown_signal, shutdown_started},
    state::AppState,
};

/// Room relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(usecases, message_pusher, config);
/// server.run().await?;
/// ```
pub struct Server {
    usecases: RelayUseCases,
    message_pusher: Arc<dyn MessagePusher>,
    config: RelayConfig,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `usecases` - UseCases for every Connection Handler operation
    /// * `message_pusher` - Pusher used to deliver acks to a single connection
    /// * `config` - Listener, heartbeat and maintenance settings
    pub fn new(
        usecases: RelayUseCases,
        message_pusher: Arc<dyn MessagePusher>,
        config: RelayConfig,
    ) -> Self {
        Self {
            usecases,
            message_pusher,
            config,
        }
    }

    fn router(&self, shutdown: watch::Receiver<bool>) -> Router {
        let app_state = Arc::new(AppState {
            usecases: self.usecases.clone(),
            message_pusher: self.message_pusher.clone(),
            config: self.config.clone(),
            shutdown,
        });

        let cors = CorsLayer::new()
            .allow_origin(allowed_origin(&self.config))
            .allow_methods(Any);

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .with_state(app_state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind to the configured address and serve until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Room relay listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `signal` resolves
    ///
    /// Every open socket is told to close when `signal` resolves; if the
    /// graceful shutdown has not finished after `shutdown_grace`, this returns anyway.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let maintenance = tokio::spawn(maintenance_loop(
            self.usecases.sweep.clone(),
            self.config.room_sweep_interval,
            self.config.rate_limit_sweep_interval,
            shutdown_rx.clone(),
        ));

        let app = self.router(shutdown_rx.clone());
        let grace = self.config.shutdown_grace;
        let mut deadline_rx = shutdown_rx;

        let server = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    signal.await;
                    let _ = shutdown_tx.send(true);
                })
                .await
        };
        let deadline = async move {
            shutdown_started(&mut deadline_rx).await;
            tokio::time::sleep(grace).await;
        };

        let result = tokio::select! {
            result = server => result,
            _ = deadline => {
                tracing::warn!("Graceful shutdown did not finish within {:?}", grace);
                Ok(())
            }
        };

        maintenance.abort();
        result
    }
}

/// HTTP エンドポイントの CORS で許可するオリジン
///
/// `*` 以外は設定した 1 オリジンのみ。ヘッダー値にできない設定はどのオリジンも許可しません。
fn allowed_origin(config: &RelayConfig) -> AllowOrigin {
    if config.allowed_origin == ANY_ORIGIN {
        return AllowOrigin::any();
    }
    match HeaderValue::from_str(config.allowed_origin.trim_end_matches('/')) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(
                "Allowed origin {:?} is not a valid header value: {}",
                config.allowed_origin,
                e
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    }
}

/// ルームの掃除とレート制限記録の破棄を、それぞれの間隔で実行
async fn maintenance_loop(
    sweep: Arc<SweepUseCase>,
    room_sweep_interval: Duration,
    rate_limit_sweep_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now();
    let mut room_tick =
        tokio::time::interval_at(start + room_sweep_interval, room_sweep_interval);
    let mut rate_limit_tick =
        tokio::time::interval_at(start + rate_limit_sweep_interval, rate_limit_sweep_interval);

    loop {
        tokio::select! {
            _ = room_tick.tick() => {
                let closed = sweep.sweep_inactive_rooms().await;
                if !closed.is_empty() {
                    tracing::info!("Room sweep closed {} idle rooms", closed.len());
                }
            }
            _ = rate_limit_tick.tick() => {
                sweep.evict_stale_rate_limits().await;
            }
            _ = shutdown_started(&mut shutdown) => break,
        }
    }
    tracing::debug!("Maintenance task stopped");
}
