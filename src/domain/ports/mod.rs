//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - GenerationService: the external level generator
//! - LevelSetSink: storage for finished level sets
//!
//! These traits keep the orchestration engine independent of any specific
//! transport or storage backend.

pub mod generation_service;
pub mod level_set_sink;

pub use generation_service::{
    GenerationError, GenerationRequest, GenerationResponse, GenerationService,
};
pub use level_set_sink::{LevelSetSink, LevelSetSummary};
