//! Relay server: axum router, WebSocket/HTTP handlers and shutdown handling.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use signal::shutdown_signal;
