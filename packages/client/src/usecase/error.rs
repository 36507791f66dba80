//! UseCase layer error types.

use thiserror::Error;

use crate::domain::{ConnectionError, DomainError, RepositoryError, RoomId};

/// Failure of a room synchronization operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// `connect` was called while a previous connect is still handshaking
    #[error("connection to room {0} is still being established")]
    ConnectInProgress(RoomId),

    /// The operation needs an open room connection
    #[error("not connected to a room")]
    NotConnected,

    /// Chat message over the length limit
    #[error("chat message is {actual} characters long (max {max})")]
    MessageTooLong { actual: usize, max: usize },
}
