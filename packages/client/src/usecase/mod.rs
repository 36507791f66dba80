//! UseCase layer: one struct per operation plus the operation-status wrapper.

mod apply_position;
mod connect_room;
mod disconnect_room;
mod error;
mod operation;
mod reconcile_participants;
mod send_message;

pub use apply_position::ApplyPositionUseCase;
pub use connect_room::{ConnectRoomUseCase, RoomConnection};
pub use disconnect_room::DisconnectRoomUseCase;
pub use error::SyncError;
pub use operation::{OperationStatus, OperationTracker};
pub use reconcile_participants::{ReconcileOutcome, ReconcileParticipantsUseCase};
pub use send_message::{MAX_CHAT_CHARS, SendMessageUseCase};
