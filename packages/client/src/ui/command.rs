//! Terminal input commands.
//!
//! Plain text is sent as chat. Lines starting with `/` are commands:
//!
//! - `/select <participant-id>` selects the avatar moved by `/move`
//! - `/move <x> <y>` clicks the scene background at `(x, y)`
//! - `/status` shows the session state and operation statuses
//! - `/help` lists the commands
//! - `/quit` leaves the room and exits

use thiserror::Error;

use crate::domain::{ParticipantId, Point};

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Chat(String),
    Select(ParticipantId),
    Move(Point),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '/{0}' (try /help)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),
}

pub const HELP: &str = "\
Commands:
  <text>             send a chat message
  /select <id>       select the participant moved by /move
  /move <x> <y>      move the selected avatar to (x, y)
  /status            show session and operation status
  /help              show this help
  /quit              leave the room and exit
";

/// Parse one trimmed, non-empty input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_string()));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (name, args.as_slice()) {
        ("select", [id]) => Ok(Command::Select(ParticipantId::new(parse_number(id)?))),
        ("select", _) => Err(CommandError::Usage("/select <participant-id>")),
        ("move", [x, y]) => Ok(Command::Move(Point::new(
            parse_coordinate(x)?,
            parse_coordinate(y)?,
        ))),
        ("move", _) => Err(CommandError::Usage("/move <x> <y>")),
        ("status", []) => Ok(Command::Status),
        ("help", _) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        (other, _) => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(word: &str) -> Result<T, CommandError> {
    word.parse()
        .map_err(|_| CommandError::InvalidNumber(word.to_string()))
}

/// Coordinates must be finite; `NaN` and `inf` cannot be sent as JSON numbers.
fn parse_coordinate(word: &str) -> Result<f64, CommandError> {
    let value: f64 = parse_number(word)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CommandError::InvalidNumber(word.to_string()))
    }
}
