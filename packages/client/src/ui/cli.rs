//! Interactive terminal client.
//!
//! Connects to one room, prints roster changes and position updates, keeps
//! the render loop running and reads commands with rustyline. The session
//! ends on `/quit`, Ctrl+C / Ctrl+D or when the server closes the room.
//! There is no automatic reconnect.

use std::{io::Write, sync::Arc};

use hiroba_shared::time::SystemClock;
use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;
use tokio::sync::{broadcast::error::RecvError, mpsc, watch};

use crate::{
    domain::{DomainError, RoomId, Session, SessionToken},
    infrastructure::{
        connection::WebSocketConnector,
        render::{HeadlessScene, RenderLoop, SpriteAvatarFactory},
        repository::InMemoryWorldRepository,
        resource::HttpResourceLoader,
    },
    usecase::SyncError,
};

use super::{
    command::{Command, HELP, parse_command},
    config::ClientConfig,
    controller::{Operation, RoomSessionController, SessionEvent},
    formatter::MessageFormatter,
    pointer::{PointerEvent, PointerOutcome},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to connect: {0}")]
    Connect(Arc<SyncError>),
}

/// Redisplay the prompt after printing a notification
fn redisplay_prompt(prompt: &str) {
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}

fn prompt_for(room: RoomId) -> String {
    format!("room {}> ", room)
}

/// Run the client until the user quits or the server closes the room.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let session = Session::new(config.token.map(SessionToken::new).transpose()?);

    let repository = Arc::new(InMemoryWorldRepository::new());
    let controller = RoomSessionController::new(
        repository.clone(),
        Arc::new(WebSocketConnector::new()),
        Arc::new(HttpResourceLoader::new(config.asset_url)),
        Arc::new(SpriteAvatarFactory::default()),
        Arc::new(HeadlessScene::new()),
        config.socket_url,
    );
    let formatter = MessageFormatter::new(Arc::new(SystemClock));
    let mut events = controller.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let render_task = tokio::spawn(RenderLoop::new(repository, config.fps).run(shutdown_rx));

    controller.select(config.participant);
    if let Err(e) = controller.connect(config.room, session).await {
        let _ = shutdown_tx.send(true);
        let _ = render_task.await;
        return Err(ClientError::Connect(e));
    }

    let prompt = prompt_for(config.room);
    println!(
        "\nJoining room {}. Type messages and press Enter to send. /help lists commands.\n",
        config.room
    );

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let readline_prompt = prompt.clone();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&readline_prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                let output = match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&controller, &formatter, command).await,
                    Err(e) => format!("{}\n", e),
                };
                print!("{}", output);
                redisplay_prompt(&prompt);
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let closed = matches!(event, SessionEvent::Closed { .. });
                        print!("{}", describe(&controller, &formatter, event).await);
                        if closed {
                            break;
                        }
                        redisplay_prompt(&prompt);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Skipped {} session events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = controller.disconnect().await;
    let _ = shutdown_tx.send(true);
    let _ = render_task.await;
    Ok(())
}

async fn execute(
    controller: &RoomSessionController,
    formatter: &MessageFormatter,
    command: Command,
) -> String {
    match command {
        Command::Chat(text) => match controller.send_chat(&text).await {
            Ok(()) => formatter.format_sent(),
            Err(e) => formatter.format_error(&e),
        },
        Command::Select(participant) => {
            controller.select(Some(participant));
            match controller.room().await.participants.get(&participant) {
                Some(p) => format!("selected {} #{}\n", p.display_name, participant),
                None => format!("selected #{} (not in the room yet)\n", participant),
            }
        }
        Command::Move(point) => {
            match controller.pointer_down(PointerEvent::background(point)).await {
                Ok(PointerOutcome::Ignored) => {
                    "select a participant in the room first (/select <id>)\n".to_string()
                }
                Ok(outcome) => {
                    tracing::debug!("Pointer outcome: {:?}", outcome);
                    String::new()
                }
                Err(e) => formatter.format_error(&e),
            }
        }
        Command::Status => {
            let statuses: Vec<_> = Operation::ALL
                .iter()
                .map(|operation| (*operation, controller.status(*operation)))
                .collect();
            formatter.format_status(controller.phase(), controller.selected(), &statuses)
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

async fn describe(
    controller: &RoomSessionController,
    formatter: &MessageFormatter,
    event: SessionEvent,
) -> String {
    match event {
        SessionEvent::Connected { room } => formatter.format_connected(room),
        SessionEvent::Closed { room, reason } => formatter.format_closed(room, reason.as_deref()),
        SessionEvent::ParticipantsChanged { report, .. } => {
            let room = controller.room().await;
            formatter.format_roster(&room, &report, controller.selected())
        }
        SessionEvent::PositionApplied {
            participant,
            target,
            ..
        } => {
            let name = controller
                .room()
                .await
                .participants
                .get(&participant)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| format!("#{}", participant));
            formatter.format_position(&name, target)
        }
    }
}
