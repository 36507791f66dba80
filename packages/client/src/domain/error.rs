//! Domain-level error types.

use thiserror::Error;

use super::value_object::Generation;

/// Invalid domain values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Session token was empty
    #[error("session token must not be empty")]
    EmptyToken,

    /// Texture key was empty
    #[error("texture key must not be empty")]
    EmptyTextureKey,

    /// Base socket address cannot carry a path
    #[error("base socket address '{0}' cannot be used to address a room")]
    InvalidEndpoint(String),
}

/// Errors reported by a `WorldRepository`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The room was replaced after the caller captured its generation
    #[error("room generation {captured} is stale (current {current})")]
    StaleGeneration {
        captured: Generation,
        current: Generation,
    },
}

/// Errors reported by a connection handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection has been closed (locally or by the server)
    #[error("connection to {0} is closed")]
    Closed(String),

    /// An outbound message could not be encoded
    #[error("failed to encode outbound message: {0}")]
    Encode(String),
}
