//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Room summary shared by `/health` and `/metrics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub member_count: usize,
    pub created_at: String,
    pub last_activity: String,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponseDto {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub active_rooms: Vec<RoomSummaryDto>,
}

/// Lifetime total plus trailing-minute count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDto {
    pub total: u64,
    pub per_minute: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetricsDto {
    pub connected: usize,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatusDto {
    pub socket_id: String,
    pub remaining: u32,
    pub blocked: bool,
    pub seconds_remaining: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDto {
    /// プロセスの常駐メモリ（取得できないプラットフォームでは `null`）
    pub rss_bytes: Option<u64>,
}

/// `GET /metrics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponseDto {
    pub timestamp: String,
    pub started_at: String,
    pub uptime_seconds: u64,
    pub memory: MemoryDto,
    pub connections: ConnectionMetricsDto,
    pub messages: RateDto,
    pub errors: RateDto,
    pub room_count: usize,
    pub active_rooms: Vec<RoomSummaryDto>,
    pub rate_limits: Vec<RateLimitStatusDto>,
}
