//! Data Transfer Objects (DTOs) for the relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs (inbound events, acks, broadcasts)
//! - `http`: HTTP API response DTOs (health, metrics)

pub mod conversion;
pub mod http;
pub mod websocket;
