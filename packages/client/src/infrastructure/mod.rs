//! Infrastructure layer: adapters implementing the domain ports.

pub mod connection;
pub mod dto;
pub mod render;
pub mod repository;
pub mod resource;
