//! Real-time room relay server.
//!
//! Clients connect over WebSocket, join rooms and have their messages relayed to
//! every other member of the room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomrelay-server
//! cargo run --bin roomrelay-server -- --host 0.0.0.0 --port 3001 --allowed-origin https://chat.example.com
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use roomrelay_server::{
    config::RelayConfig,
    domain::RateLimitPolicy,
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        metrics::InMemoryMetricsRecorder,
        rate_limiter::InMemoryRateLimiter,
        repository::{InMemoryConnectionRepository, InMemoryRoomRegistry},
    },
    ui::Server,
    usecase::{EventGate, RelayContext, RelayUseCases},
};
use roomrelay_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "roomrelay-server")]
#[command(about = "Real-time room relay over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Origin allowed to open a WebSocket ("*" allows any)
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "*")]
    allowed_origin: String,

    /// Actions allowed per rate-limit window
    #[arg(
        long,
        env = "RATE_LIMIT_POINTS",
        default_value = "50",
        value_parser = clap::value_parser!(u32).range(1..),
    )]
    rate_limit_points: u32,

    /// Rate-limit window length in seconds
    #[arg(
        long,
        env = "RATE_LIMIT_WINDOW_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    rate_limit_window_secs: u64,

    /// Block duration in seconds once the budget is exceeded
    #[arg(long, env = "RATE_LIMIT_BLOCK_SECS", default_value = "300")]
    rate_limit_block_secs: u64,

    /// Seconds an empty room may stay idle before the sweep removes it
    #[arg(long, env = "ROOM_INACTIVITY_TIMEOUT_SECS", default_value = "3600")]
    room_inactivity_timeout_secs: u64,

    /// Seconds between idle-room sweeps
    #[arg(
        long,
        env = "ROOM_SWEEP_INTERVAL_SECS",
        default_value = "900",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    room_sweep_interval_secs: u64,

    /// Seconds between stale rate-limit record evictions
    #[arg(
        long,
        env = "RATE_LIMIT_SWEEP_INTERVAL_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    rate_limit_sweep_interval_secs: u64,

    /// Seconds between heartbeat pings
    #[arg(
        long,
        env = "PING_INTERVAL_SECS",
        default_value = "25",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    ping_interval_secs: u64,

    /// Extra seconds of silence tolerated after a ping before disconnecting
    #[arg(long, env = "PING_TIMEOUT_SECS", default_value = "20")]
    ping_timeout_secs: u64,

    /// Frames queued per connection before a slow reader is disconnected
    #[arg(
        long,
        env = "OUTBOUND_QUEUE_CAPACITY",
        default_value = "256",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    outbound_queue_capacity: u64,

    /// Seconds to wait for a graceful shutdown before exiting anyway
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "10")]
    shutdown_grace_secs: u64,
}

impl From<Args> for RelayConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            allowed_origin: args.allowed_origin,
            rate_limit: RateLimitPolicy {
                points: args.rate_limit_points,
                window: Duration::from_secs(args.rate_limit_window_secs),
                block_duration: Duration::from_secs(args.rate_limit_block_secs),
            },
            room_inactivity_timeout: Duration::from_secs(args.room_inactivity_timeout_secs),
            room_sweep_interval: Duration::from_secs(args.room_sweep_interval_secs),
            rate_limit_sweep_interval: Duration::from_secs(args.rate_limit_sweep_interval_secs),
            ping_interval: Duration::from_secs(args.ping_interval_secs),
            ping_timeout: Duration::from_secs(args.ping_timeout_secs),
            outbound_queue_capacity: args.outbound_queue_capacity as usize,
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = RelayConfig::from(Args::parse());

    // Initialize dependencies in order:
    // 1. Clock / Repositories / RateLimiter / Metrics
    // 2. MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. In-memory state
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rooms = Arc::new(InMemoryRoomRegistry::new(clock.clone()));
    let connections = Arc::new(InMemoryConnectionRepository::new());
    let rate_limiter = Arc::new(InMemoryRateLimiter::new(
        config.rate_limit,
        clock.clone(),
    ));
    let metrics = Arc::new(InMemoryMetricsRecorder::new(clock.clone()));

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create UseCases
    let context = RelayContext {
        rooms,
        connections,
        rate_limiter,
        message_pusher: message_pusher.clone(),
        metrics,
        gate: Arc::new(EventGate::new()),
        clock,
    };
    let usecases = RelayUseCases::new(context, config.room_inactivity_timeout);

    // 4. Create and run the server
    let server = Server::new(usecases, message_pusher, config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
