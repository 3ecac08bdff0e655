//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object tagged by `type` with camelCase fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Frame type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Connected,
    Ack,
    UserJoined,
    UserLeft,
    Message,
    RoomClosed,
}

// ========================================
// Inbound
// ========================================

/// Event sent by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    Join(JoinRequest),
    Message(MessageRequest),
}

impl ClientEvent {
    pub fn request_id(&self) -> Option<Value> {
        match self {
            Self::Join(request) => request.request_id.clone(),
            Self::Message(request) => request.request_id.clone(),
        }
    }
}

/// `join` request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(default)]
    pub room_id: Option<String>,
}

/// `message` request
///
/// Fields other than the named ones are kept in `extra` and forwarded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pull `requestId` out of a frame that failed to parse as a `ClientEvent`
pub fn recover_request_id(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()?
        .get("requestId")
        .cloned()
}

// ========================================
// Outbound
// ========================================

/// Sent once after the upgrade so the client learns its connection id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub r#type: MessageType,
    pub socket_id: String,
    pub timestamp: String,
}

/// Acknowledgment to the originating connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckMessage {
    pub r#type: MessageType,
    pub request_id: Option<Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_info: Option<RoomInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_data: Option<MessageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitInfo>,
}

impl AckMessage {
    pub fn success(request_id: Option<Value>) -> Self {
        Self {
            r#type: MessageType::Ack,
            request_id,
            success: true,
            error: None,
            room_info: None,
            message_data: None,
            timestamp: None,
            rate_limit: None,
        }
    }

    pub fn failure(request_id: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(request_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: String,
    pub member_count: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub remaining: u32,
    /// Seconds until the connection may act again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// A relayed message as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub room_id: String,
    pub content: String,
    pub timestamp: String,
    pub socket_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `message` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub r#type: MessageType,
    #[serde(flatten)]
    pub data: MessageData,
}

/// `userJoined` / `userLeft` broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresenceMessage {
    pub r#type: MessageType,
    pub room_id: String,
    pub socket_id: String,
    pub timestamp: String,
    pub member_count: usize,
}

/// `roomClosed` broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosedMessage {
    pub r#type: MessageType,
    pub room_id: String,
    pub reason: String,
    pub timestamp: String,
}
