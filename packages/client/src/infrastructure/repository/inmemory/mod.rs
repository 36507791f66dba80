//! InMemory repository implementations.

mod world;

pub use world::InMemoryWorldRepository;
