//! Data Transfer Objects (DTOs) for the room connection.
//!
//! - `websocket`: wire message shapes (JSON text frames)
//! - `conversion`: DTO ⇔ domain conversion, inbound classification and outbound encoding

pub mod conversion;
pub mod websocket;

pub use conversion::{decode_inbound, encode_outbound};
