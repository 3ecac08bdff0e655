//! Infrastructure 層
//!
//! ドメイン層の trait に対するインメモリ・WebSocket 実装と、通信用の DTO を提供します。

pub mod dto;
pub mod message_pusher;
pub mod metrics;
pub mod rate_limiter;
pub mod repository;
