//! Error types for the visualization engine.

use kinoview_env::HostError;
use thiserror::Error;

/// Errors surfaced by the engine's public entry points.
///
/// Degenerate geometry (zero-length links, anti-parallel directions) is
/// resolved inside the link synthesizer and never shows up here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The display surface is missing or unusable. Fatal to construction.
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// Wrong-length or non-finite joint-angle vector. No state was changed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Creates an initialization error.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::InitializationError(msg.into())
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Returns true if the caller may retry with corrected input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<HostError> for EngineError {
    fn from(err: HostError) -> Self {
        Self::InitializationError(err.to_string())
    }
}

/// Errors raised while loading or validating an `EngineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a scene renderer backend.
///
/// The render loop logs these and keeps running.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render backend error: {0}")]
    Backend(String),
}

impl RenderError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
