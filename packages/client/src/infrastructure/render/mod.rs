//! Headless rendering collaborators: scene graph, sprite avatars and the frame loop.

pub mod avatar;
pub mod render_loop;
pub mod scene;

pub use avatar::{SpriteAvatar, SpriteAvatarFactory};
pub use render_loop::RenderLoop;
pub use scene::HeadlessScene;
