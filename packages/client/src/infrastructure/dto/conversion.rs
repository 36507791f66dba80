//! Conversion logic between DTOs and domain entities.

use crate::domain::{
    AvatarDescriptor, AvatarId, EntityPosition, IncomingParticipant, OutboundMessage,
    ParticipantId, Point, RoomEvent,
};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::AvatarPayload> for AvatarDescriptor {
    fn from(dto: dto::AvatarPayload) -> Self {
        Self {
            id: AvatarId::new(dto.id),
            texture: dto.texture,
            script: dto.script,
        }
    }
}

impl From<dto::ParticipantPayload> for IncomingParticipant {
    fn from(dto: dto::ParticipantPayload) -> Self {
        Self {
            id: ParticipantId::new(dto.id),
            display_name: dto.display_name,
            avatar: dto.avatar.map(AvatarDescriptor::from),
        }
    }
}

impl From<dto::EntityPositionPayload> for EntityPosition {
    fn from(dto: dto::EntityPositionPayload) -> Self {
        Self {
            id: ParticipantId::new(dto.id),
            point: Point::new(dto.x, dto.y),
        }
    }
}

impl From<dto::InboundMessage> for RoomEvent {
    fn from(dto: dto::InboundMessage) -> Self {
        match dto {
            dto::InboundMessage::Snapshot(participants) => RoomEvent::Snapshot(
                participants
                    .into_iter()
                    .map(IncomingParticipant::from)
                    .collect(),
            ),
            dto::InboundMessage::Position(position) => RoomEvent::Position(position.into()),
        }
    }
}

/// Classify an inbound text frame.
pub fn decode_inbound(text: &str) -> Result<RoomEvent, serde_json::Error> {
    let message: dto::InboundMessage = serde_json::from_str(text)?;
    Ok(message.into())
}

// ========================================
// Domain Entity → DTO
// ========================================

/// Encode an outbound message as a JSON text frame.
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, serde_json::Error> {
    match message {
        OutboundMessage::Chat { token, message } => serde_json::to_string(&dto::ChatMessage {
            token: token.as_ref().map(|t| t.as_str().to_string()),
            message: message.clone(),
        }),
        OutboundMessage::AvatarPosition { avatar, point } => {
            serde_json::to_string(&dto::TypedMessage::AvatarPosition(
                dto::EntityPositionPayload {
                    id: avatar.value(),
                    x: point.x,
                    y: point.y,
                },
            ))
        }
    }
}
