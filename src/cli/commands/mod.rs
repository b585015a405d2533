//! CLI command implementations.

pub mod generate;
pub mod preview;
pub mod sets;
