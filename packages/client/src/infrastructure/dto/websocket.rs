//! WebSocket message DTOs.

use serde::{Deserialize, Serialize};

/// Avatar descriptor inside a participant snapshot entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarPayload {
    pub id: i64,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// One entry of the participant snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPayload {
    pub id: i64,
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<AvatarPayload>,
}

/// Position of one entity (`{ id, x, y }`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityPositionPayload {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

/// Inbound frames pushed by the room server
///
/// A JSON array is a full participant snapshot; an `{ id, x, y }` object is a
/// position delta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    Snapshot(Vec<ParticipantPayload>),
    Position(EntityPositionPayload),
}

/// Outbound chat message (`{ token, message }`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub token: Option<String>,
    pub message: String,
}

/// Outbound typed envelope (`{ type, payload }`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TypedMessage {
    /// Move command for the local user's avatar
    #[serde(rename = "avatar.position")]
    AvatarPosition(EntityPositionPayload),
}
