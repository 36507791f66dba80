//! Domain layer: entities, value objects, ports and the pure motion rules.
//!
//! Infrastructure adapters implement the traits declared here (`port`,
//! `repository`); use cases depend only on this module.

pub mod entity;
pub mod error;
pub mod motion;
pub mod port;
pub mod repository;
pub mod value_object;

pub use entity::{
    AvatarDescriptor, EntityPosition, Frame, IncomingParticipant, MergeReport, OutboundMessage,
    Participant, ParticipantMap, Room, RoomEvent, SpriteSheet,
};
pub use error::{ConnectionError, DomainError, RepositoryError};
pub use motion::{INVERSE_VELOCITY, step_towards, velocity_towards};
pub use port::{
    AVATAR_ANCHOR, AVATAR_HEIGHT, AVATAR_WIDTH, AvatarControl, AvatarFactory, ConnectionEvent,
    ConnectionHandle, OpenedConnection, ResourceLoader, RoomConnector, Scene, SceneNode,
};
pub use repository::{ParticipantMerge, WorldRepository};
pub use value_object::{
    AvatarId, Generation, NodeId, ParticipantId, Point, RoomId, Session, SessionToken,
    TextureKey, Velocity, room_endpoint,
};
