//! Prompt compilation, image providers and the generation engine behind the
//! rink hockey print studio.

pub mod config;
pub mod download;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod session;

pub use config::EngineConfig;
pub use error::GenerateError;
pub use orchestrator::DesignEngine;
pub use prompt::{compile, CompiledPrompt};
pub use session::StudioSession;
