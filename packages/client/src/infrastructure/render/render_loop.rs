//! Frame loop stepping every avatar of the current room.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::domain::WorldRepository;

/// Drives `AvatarControl::advance` at a fixed frame rate.
pub struct RenderLoop {
    repository: Arc<dyn WorldRepository>,
    frame: Duration,
}

impl RenderLoop {
    /// Create a loop ticking `fps` times per second (at least once).
    pub fn new(repository: Arc<dyn WorldRepository>, fps: u32) -> Self {
        Self {
            repository,
            frame: Duration::from_secs(1) / fps.max(1),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame
    }

    /// Advance every avatar by one frame.
    pub async fn tick(&self) {
        let room = self.repository.get_room().await;
        for participant in room.participants.values() {
            participant.avatar.advance();
        }
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.frame);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Render loop stopped");
    }
}
