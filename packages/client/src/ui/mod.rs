//! UI layer: session controller, pointer dispatch and the terminal client.

pub mod cli;
pub mod command;
pub mod config;
pub mod controller;
pub mod formatter;
pub mod pointer;

pub use cli::{ClientError, run_client};
pub use config::ClientConfig;
pub use controller::{Operation, RoomSessionController, SessionEvent, SessionPhase};
pub use pointer::{PointerDispatcher, PointerEvent, PointerOutcome};
