//! Message formatting utilities for the terminal client.

use std::sync::Arc;

use hiroba_shared::time::{Clock, format_jst_clock};

use crate::{
    domain::{MergeReport, ParticipantId, Point, Room, RoomId},
    usecase::{OperationStatus, SyncError},
};

use super::controller::{Operation, SessionPhase};

const RULE: &str = "============================================================";

/// Message formatter for client display
///
/// Every line is stamped with the JST wall-clock time of the injected clock.
pub struct MessageFormatter {
    clock: Arc<dyn Clock>,
}

impl MessageFormatter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn stamp(&self) -> String {
        format_jst_clock(self.clock.now_millis())
    }

    /// Format the handshake-completed notification
    pub fn format_connected(&self, room: RoomId) -> String {
        format!("\n[{}] Connected to room {}\n", self.stamp(), room)
    }

    /// Format a server-side close
    pub fn format_closed(&self, room: RoomId, reason: Option<&str>) -> String {
        match reason {
            Some(reason) if !reason.is_empty() => format!(
                "\n[{}] Room {} closed by server: {}\n",
                self.stamp(),
                room,
                reason
            ),
            _ => format!("\n[{}] Room {} closed by server\n", self.stamp(), room),
        }
    }

    /// Format the participant list after a snapshot
    ///
    /// # Arguments
    ///
    /// * `room` - Room after the snapshot was applied
    /// * `report` - What the snapshot changed
    /// * `selected` - Participant moved by background clicks (marked "me")
    pub fn format_roster(
        &self,
        room: &Room,
        report: &MergeReport,
        selected: Option<ParticipantId>,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!("[{}] Participants in room {}:\n", self.stamp(), room.id));

        let ids = room.participant_ids();
        if ids.is_empty() {
            output.push_str("(No participants)\n");
        }
        for id in ids {
            let Some(participant) = room.participants.get(&id) else {
                continue;
            };
            let me_suffix = if selected == Some(id) { " (me)" } else { "" };
            let new_marker = if report.added.contains(&id) { "+ " } else { "  " };
            output.push_str(&format!(
                "{}{} #{}{}\n",
                new_marker, participant.display_name, id, me_suffix
            ));
        }
        for id in &report.removed {
            output.push_str(&format!("- #{} left\n", id));
        }
        if !report.skipped.is_empty() {
            let skipped: Vec<String> = report.skipped.iter().map(|id| format!("#{}", id)).collect();
            output.push_str(&format!("(skipped without avatar: {})\n", skipped.join(", ")));
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format a position update
    pub fn format_position(&self, name: &str, target: Point) -> String {
        format!(
            "\n[{}] {} → ({}, {})\n",
            self.stamp(),
            name,
            target.x,
            target.y
        )
    }

    /// Format the sent confirmation
    pub fn format_sent(&self) -> String {
        format!("sent at {}\n", self.stamp())
    }

    /// Format a failed operation
    pub fn format_error(&self, error: &SyncError) -> String {
        format!("\n[{}] ! {}\n", self.stamp(), error)
    }

    /// Format the `/status` output
    pub fn format_status(
        &self,
        phase: SessionPhase,
        selected: Option<ParticipantId>,
        statuses: &[(Operation, OperationStatus)],
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        let phase = match phase {
            SessionPhase::Disconnected => "disconnected".to_string(),
            SessionPhase::Connecting { room, .. } => format!("connecting to room {}", room),
            SessionPhase::Connected { room, .. } => format!("connected to room {}", room),
        };
        output.push_str(&format!("Session: {}\n", phase));
        match selected {
            Some(id) => output.push_str(&format!("Selected: #{}\n", id)),
            None => output.push_str("Selected: (none)\n"),
        }
        for (operation, status) in statuses {
            let status = match status {
                OperationStatus::Idle => "idle".to_string(),
                OperationStatus::Loading => "loading".to_string(),
                OperationStatus::Error(e) => format!("error: {}", e),
            };
            output.push_str(&format!("{:<22}{}\n", operation.id(), status));
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }
}
