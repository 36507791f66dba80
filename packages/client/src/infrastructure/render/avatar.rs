//! Sprite-backed avatars.
//!
//! `SpriteAvatar` owns its render position. `move_to` stores the target and
//! the dispatch-time velocity; every `advance` moves one frame towards the
//! target and snaps on arrival.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use crate::domain::{
    AvatarControl, AvatarFactory, NodeId, Point, SpriteSheet, Velocity, step_towards,
};

#[derive(Debug, Default)]
struct Motion {
    position: Point,
    heading: Option<(Point, Velocity)>,
}

/// Avatar rendered from a sprite sheet
///
/// The sheet itself is drawn by the scene; the avatar only tracks its sprite
/// and label nodes and where they are.
#[derive(Debug)]
pub struct SpriteAvatar {
    sprite: NodeId,
    label: NodeId,
    motion: Mutex<Motion>,
}

impl SpriteAvatar {
    pub fn new(sprite: NodeId, label: NodeId, position: Point) -> Self {
        Self {
            sprite,
            label,
            motion: Mutex::new(Motion {
                position,
                heading: None,
            }),
        }
    }

    /// Target and velocity of the move in progress.
    pub fn heading(&self) -> Option<(Point, Velocity)> {
        self.motion().heading
    }

    fn motion(&self) -> MutexGuard<'_, Motion> {
        self.motion.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AvatarControl for SpriteAvatar {
    fn sprite(&self) -> NodeId {
        self.sprite
    }

    fn name_label(&self) -> NodeId {
        self.label
    }

    fn position(&self) -> Point {
        self.motion().position
    }

    fn move_to(&self, target: Point, velocity: Velocity) {
        let mut motion = self.motion();
        if motion.position == target {
            motion.heading = None;
        } else {
            motion.heading = Some((target, velocity));
        }
    }

    fn advance(&self) {
        let mut motion = self.motion();
        let Some((target, velocity)) = motion.heading else {
            return;
        };
        motion.position = step_towards(motion.position, target, velocity);
        if motion.position == target {
            motion.heading = None;
        }
    }
}

/// Creates [`SpriteAvatar`]s with unique scene node ids.
#[derive(Debug)]
pub struct SpriteAvatarFactory {
    next_node: AtomicU64,
    spawn_point: Point,
}

impl SpriteAvatarFactory {
    pub fn new(spawn_point: Point) -> Self {
        Self {
            next_node: AtomicU64::new(1),
            spawn_point,
        }
    }

    fn allocate(&self) -> NodeId {
        NodeId::new(self.next_node.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SpriteAvatarFactory {
    fn default() -> Self {
        Self::new(Point::default())
    }
}

impl AvatarFactory for SpriteAvatarFactory {
    fn create(
        &self,
        display_name: &str,
        sheet: Arc<SpriteSheet>,
        script: Option<&str>,
    ) -> Arc<dyn AvatarControl> {
        let avatar = SpriteAvatar::new(self.allocate(), self.allocate(), self.spawn_point);
        tracing::debug!(
            "Created avatar for {} (sprite {}, label {}, image {}, script {:?})",
            display_name,
            avatar.sprite.value(),
            avatar.label.value(),
            sheet.image,
            script
        );
        Arc::new(avatar)
    }
}
