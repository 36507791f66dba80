//! Sprite-sheet resource loaders.
//!
//! - `http`: fetches sprite-sheet descriptors over HTTP (reqwest)
//! - `memory`: serves a preloaded catalog, optionally holding loads until released

pub mod http;
pub mod memory;

pub use http::HttpResourceLoader;
pub use memory::InMemoryResourceLoader;
