//! Entities of the room synchronization domain.

use std::{collections::BTreeMap, collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{
    port::AvatarControl,
    value_object::{AvatarId, ParticipantId, Point, RoomId, SessionToken},
};

/// A participant's presence in the room.
///
/// `avatar` is the live handle to the rendered sprite; cloning a participant
/// shares the same handle, so identity survives snapshot reconciliation.
#[derive(Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub avatar_id: AvatarId,
    pub avatar: Arc<dyn AvatarControl>,
}

impl Participant {
    /// `true` when both participants share the same avatar handle.
    pub fn same_avatar(&self, other: &Participant) -> bool {
        Arc::ptr_eq(&self.avatar, &other.avatar)
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("avatar_id", &self.avatar_id)
            .field("sprite", &self.avatar.sprite())
            .finish()
    }
}

/// Participants of a room keyed by their id.
pub type ParticipantMap = HashMap<ParticipantId, Participant>;

/// The room the client is currently attached to.
///
/// Replaced wholesale on connect/disconnect; `Room::default()` is the empty
/// room held while disconnected.
#[derive(Debug, Clone, Default)]
pub struct Room {
    pub id: RoomId,
    pub participants: ParticipantMap,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            participants: ParticipantMap::new(),
        }
    }

    /// Participant ids sorted ascending.
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self.participants.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Avatar descriptor carried by a participant snapshot entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarDescriptor {
    pub id: AvatarId,
    /// `None` when the server sent no texture (or `null`)
    pub texture: Option<String>,
    pub script: Option<String>,
}

/// One entry of a server-pushed participant snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingParticipant {
    pub id: ParticipantId,
    pub display_name: String,
    pub avatar: Option<AvatarDescriptor>,
}

/// Position update for one participant's avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityPosition {
    pub id: ParticipantId,
    pub point: Point,
}

/// Inbound room traffic after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Full participant list
    Snapshot(Vec<IncomingParticipant>),
    /// Single position delta
    Position(EntityPosition),
}

/// Messages the client sends over the room connection.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Chat {
        token: Option<SessionToken>,
        message: String,
    },
    AvatarPosition {
        avatar: AvatarId,
        point: Point,
    },
}

/// Outcome of merging a snapshot into the participant map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<ParticipantId>,
    pub kept: Vec<ParticipantId>,
    pub removed: Vec<ParticipantId>,
    pub skipped: Vec<ParticipantId>,
}

impl MergeReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A region of a sprite sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A loaded sprite sheet: the backing image and its named animation frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSheet {
    pub image: String,
    #[serde(default)]
    pub frames: BTreeMap<String, Frame>,
}
