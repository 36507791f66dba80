//! Ports to the collaborators around the room client.
//!
//! The rendering engine (scene graph, avatars, texture loading) and the
//! network transport are consumed through these traits. Infrastructure
//! provides the concrete adapters.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use super::{
    entity::{OutboundMessage, SpriteSheet},
    error::ConnectionError,
    value_object::{NodeId, Point, TextureKey, Velocity},
};

/// Rendered footprint of an avatar sprite.
pub const AVATAR_WIDTH: f64 = 142.0;
pub const AVATAR_HEIGHT: f64 = 156.0;
/// Sprites and name labels are anchored at their center.
pub const AVATAR_ANCHOR: f64 = 0.5;

/// Display object attached to the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Sprite {
        id: NodeId,
        width: f64,
        height: f64,
        anchor: f64,
    },
    Label {
        id: NodeId,
        text: String,
        anchor: f64,
    },
}

impl SceneNode {
    /// Avatar sprite with the fixed footprint and centered anchor.
    pub fn avatar_sprite(id: NodeId) -> Self {
        Self::Sprite {
            id,
            width: AVATAR_WIDTH,
            height: AVATAR_HEIGHT,
            anchor: AVATAR_ANCHOR,
        }
    }

    /// Centered name label.
    pub fn name_label(id: NodeId, text: impl Into<String>) -> Self {
        Self::Label {
            id,
            text: text.into(),
            anchor: AVATAR_ANCHOR,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Self::Sprite { id, .. } | Self::Label { id, .. } => *id,
        }
    }
}

/// Scene graph capability: child attachment and removal.
#[cfg_attr(test, mockall::automock)]
pub trait Scene: Send + Sync {
    fn attach(&self, node: SceneNode);
    fn detach(&self, id: NodeId);
}

/// Visual and motion handle of one participant's avatar.
pub trait AvatarControl: Send + Sync {
    /// Sprite display object
    fn sprite(&self) -> NodeId;
    /// Name label display object
    fn name_label(&self) -> NodeId;
    /// Current render position (authoritative on the client)
    fn position(&self) -> Point;
    /// Start moving towards `target` by `velocity` per frame until arrival.
    fn move_to(&self, target: Point, velocity: Velocity);
    /// Advance one render frame.
    fn advance(&self);
}

/// Builds avatars from loaded sprite sheets.
pub trait AvatarFactory: Send + Sync {
    fn create(
        &self,
        display_name: &str,
        sheet: Arc<SpriteSheet>,
        script: Option<&str>,
    ) -> Arc<dyn AvatarControl>;
}

/// Texture resource loader shared by every reconciliation.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Enqueue a resource once. Returns `false` when the key is already
    /// enqueued or loaded.
    fn enqueue(&self, key: &TextureKey) -> bool;

    /// Resolve once every resource enqueued so far has finished loading.
    async fn load(&self);

    /// Loaded sprite sheet, or `None` when the key never resolved.
    fn sprite_sheet(&self, key: &TextureKey) -> Option<Arc<SpriteSheet>>;
}

/// Notifications emitted by a room connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Handshake completed
    Opened,
    /// Inbound text frame
    Text(String),
    /// The connection closed without being asked to
    Closed { reason: Option<String> },
}

/// One persistent connection to a room.
pub trait ConnectionHandle: Send + Sync {
    fn endpoint(&self) -> &Url;

    /// Queue an outbound message.
    fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError>;

    /// Stop reporting `ConnectionEvent::Closed` for this connection.
    fn detach_close_listener(&self);

    /// Close the connection. Idempotent.
    fn close(&self);
}

/// A freshly opened connection and its event stream.
pub struct OpenedConnection {
    pub handle: Arc<dyn ConnectionHandle>,
    pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

/// Opens room connections.
///
/// `open` returns immediately; the handshake completes in the background and
/// is reported as `ConnectionEvent::Opened`.
pub trait RoomConnector: Send + Sync {
    fn open(&self, endpoint: Url) -> OpenedConnection;
}
