//! Error types shared across the engine

use thiserror::Error;

use crate::events::EventError;
use crate::renderer::RenderError;

/// A platform or GPU object could not be created.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("Failed to create event loop: {0}")]
    EventLoop(String),

    #[error("Failed to create window: {0}")]
    Window(String),

    #[error("Failed to get default Metal device")]
    Device,

    #[error("Failed to create command queue")]
    CommandQueue,

    #[error("Failed to attach drawable surface: {0}")]
    Surface(String),

    #[error("Failed to load library: {0}")]
    Library(String),

    #[error("Failed to find shader function '{name}'")]
    Shader { name: String },

    #[error("Failed to create pipeline: {0}")]
    Pipeline(String),

    #[error("Unsupported platform: {0}")]
    Unsupported(&'static str),
}

/// Top-level error returned to the application entry point.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Event(#[from] EventError),
}
