//! Generation service adapters.

pub mod http;
pub mod scripted;

pub use http::HttpGenerationService;
pub use scripted::ScriptedGenerationService;
