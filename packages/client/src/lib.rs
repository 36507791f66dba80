//! Hiroba room synchronization client.
//!
//! Keeps a local copy of a shared room (participants and their avatars) in
//! sync with a room server over a persistent WebSocket connection:
//!
//! - participant snapshots are reconciled into the participant map, keeping
//!   each existing avatar's identity stable
//! - position deltas start per-frame interpolation towards the new target
//! - local move commands and chat are sent back to the server
//!
//! Layers: [`domain`] (entities, ports, motion rules), [`infrastructure`]
//! (adapters), [`usecase`] (one struct per operation) and [`ui`] (session
//! controller and terminal client).

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
