//! Client runtime configuration.

use url::Url;

use crate::domain::{ParticipantId, RoomId};

pub const DEFAULT_SOCKET_URL: &str = "ws://127.0.0.1:8080";
pub const DEFAULT_ASSET_URL: &str = "http://127.0.0.1:8080/assets";
pub const DEFAULT_FPS: u32 = 60;

/// Settings for [`run_client`](super::cli::run_client)
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base socket address; rooms live under `<socket_url>/worlds/<room>`
    pub socket_url: Url,
    /// Base URL sprite-sheet descriptors are fetched from
    pub asset_url: Url,
    pub room: RoomId,
    pub token: Option<String>,
    /// Participant selected for `/move` and background clicks on startup
    pub participant: Option<ParticipantId>,
    pub fps: u32,
}
