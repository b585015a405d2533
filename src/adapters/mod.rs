//! Adapters for the generation service and level set storage.

pub mod generation;
pub mod sqlite;
