//! Room connection implementations.
//!
//! - `websocket`: tokio-tungstenite client
//! - `memory`: in-process connection driven by the caller (tests, demos)

pub mod memory;
pub mod websocket;

pub use memory::{MemoryConnection, MemoryConnector};
pub use websocket::{WebSocketConnection, WebSocketConnector};
