//! Hiroba room client.
//!
//! Connects to a room on a Hiroba server, keeps the participant map and
//! avatar positions in sync, and sends chat messages and move commands typed
//! at the prompt.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --room 1 --token secret
//! cargo run --bin hiroba-client -- -r 1 -p 42 --socket-url ws://127.0.0.1:8080
//! ```

use clap::Parser;
use url::Url;

use hiroba_client::{
    domain::{ParticipantId, RoomId},
    ui::{
        ClientConfig, run_client,
        config::{DEFAULT_ASSET_URL, DEFAULT_FPS, DEFAULT_SOCKET_URL},
    },
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Room synchronization client for Hiroba", long_about = None)]
struct Args {
    /// Room to join
    #[arg(short = 'r', long)]
    room: i64,

    /// Session token (omit for an unauthenticated connection)
    #[arg(short = 't', long)]
    token: Option<String>,

    /// Participant whose avatar /move controls
    #[arg(short = 'p', long)]
    participant: Option<i64>,

    /// Base socket address
    #[arg(short = 'u', long, default_value = DEFAULT_SOCKET_URL)]
    socket_url: Url,

    /// Base URL for sprite-sheet descriptors
    #[arg(long, default_value = DEFAULT_ASSET_URL)]
    asset_url: Url,

    /// Render loop frame rate
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: u32,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            socket_url: args.socket_url,
            asset_url: args.asset_url,
            room: RoomId::new(args.room),
            token: args.token,
            participant: args.participant.map(ParticipantId::new),
            fps: args.fps,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&["hiroba-client", env!("CARGO_BIN_NAME")], "info");

    let args = Args::parse();

    if let Err(e) = run_client(args.into()).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
