//! Conversion logic between DTOs and domain entities.

use roomrelay_shared::time::timestamp_to_rfc3339;

use crate::domain::{RateLimitStatus, RelayEvent, RelayMessage, Room};
use crate::infrastructure::dto::{
    http::{RateLimitStatusDto, RoomSummaryDto},
    websocket::{
        MessageData, MessageType, RoomClosedMessage, RoomInfo, RoomMessage, UserPresenceMessage,
    },
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Room> for RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            member_count: room.member_count(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            last_activity: timestamp_to_rfc3339(room.last_activity.value()),
        }
    }
}

impl From<&Room> for RoomInfo {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id.as_str().to_string(),
            member_count: room.member_count(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&RateLimitStatus> for RateLimitStatusDto {
    fn from(status: &RateLimitStatus) -> Self {
        Self {
            socket_id: status.connection_id.as_str().to_string(),
            remaining: status.remaining,
            blocked: status.block.blocked,
            seconds_remaining: status.block.seconds_remaining,
        }
    }
}

impl From<&RelayMessage> for MessageData {
    fn from(message: &RelayMessage) -> Self {
        Self {
            room_id: message.room_id.as_str().to_string(),
            content: message.content.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(message.timestamp.value()),
            socket_id: message.sender.as_str().to_string(),
            extra: message.extra.clone(),
        }
    }
}

/// Encode a broadcast event as the JSON text frame clients receive
pub fn encode_relay_event(event: &RelayEvent) -> serde_json::Result<String> {
    match event {
        RelayEvent::UserJoined {
            room_id,
            connection_id,
            member_count,
            timestamp,
        } => serde_json::to_string(&UserPresenceMessage {
            r#type: MessageType::UserJoined,
            room_id: room_id.as_str().to_string(),
            socket_id: connection_id.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(timestamp.value()),
            member_count: *member_count,
        }),
        RelayEvent::UserLeft {
            room_id,
            connection_id,
            member_count,
            timestamp,
        } => serde_json::to_string(&UserPresenceMessage {
            r#type: MessageType::UserLeft,
            room_id: room_id.as_str().to_string(),
            socket_id: connection_id.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(timestamp.value()),
            member_count: *member_count,
        }),
        RelayEvent::Message(message) => serde_json::to_string(&RoomMessage {
            r#type: MessageType::Message,
            data: message.into(),
        }),
        RelayEvent::RoomClosed(closure) => serde_json::to_string(&RoomClosedMessage {
            r#type: MessageType::RoomClosed,
            room_id: closure.room_id.as_str().to_string(),
            reason: closure.reason.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(closure.closed_at.value()),
        }),
    }
}
