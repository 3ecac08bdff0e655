//! HTTP endpoint handlers.
//!
//! Both endpoints only read state; responses are never cached.

use std::sync::Arc;

use axum::{Json, extract::State, http::header, response::IntoResponse};

use roomrelay_shared::{
    process::resident_memory_bytes,
    time::{get_utc_timestamp, timestamp_to_rfc3339},
};

use crate::{
    infrastructure::dto::http::{
        ConnectionMetricsDto, HealthResponseDto, MemoryDto, MetricsResponseDto, RateDto,
        RateLimitStatusDto, RoomSummaryDto,
    },
    ui::state::AppState,
};

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Liveness probe with a snapshot of active rooms
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms = state.usecases.get_health.execute().await;

    // Domain Model から DTO への変換
    let body = HealthResponseDto {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: timestamp_to_rfc3339(get_utc_timestamp()),
        active_rooms: rooms.iter().map(RoomSummaryDto::from).collect(),
    };

    ([(header::CACHE_CONTROL, "no-store")], Json(body))
}

/// Counters, per-minute rates, process memory, rooms and rate-limit status
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.usecases.get_metrics.execute().await;
    let counters = report.counters;

    // Domain Model から DTO への変換
    let body = MetricsResponseDto {
        timestamp: timestamp_to_rfc3339(get_utc_timestamp()),
        started_at: timestamp_to_rfc3339(counters.started_at.value()),
        uptime_seconds: counters.uptime.as_secs(),
        memory: MemoryDto {
            rss_bytes: resident_memory_bytes(),
        },
        connections: ConnectionMetricsDto {
            connected: counters.connected_clients,
            total: counters.total_connections,
        },
        messages: RateDto {
            total: counters.total_messages,
            per_minute: counters.messages_per_minute,
        },
        errors: RateDto {
            total: counters.total_errors,
            per_minute: counters.errors_per_minute,
        },
        room_count: report.rooms.len(),
        active_rooms: report.rooms.iter().map(RoomSummaryDto::from).collect(),
        rate_limits: report
            .rate_limits
            .iter()
            .map(RateLimitStatusDto::from)
            .collect(),
    };

    ([(header::CACHE_CONTROL, "no-store")], Json(body))
}
