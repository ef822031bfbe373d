//! Error types for the Kinoview host abstraction.

use thiserror::Error;

/// Errors that can occur while talking to the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    /// No display surface is registered under the requested identifier
    #[error("Display surface not found: {0}")]
    SurfaceNotFound(String),

    /// The surface exists but reports an unusable size
    #[error("Invalid viewport for surface {surface}: {width}x{height}")]
    InvalidViewport {
        surface: String,
        width: u32,
        height: u32,
    },

    /// The surface handle no longer refers to a live surface
    #[error("Display surface detached: {0}")]
    SurfaceDetached(String),
}

impl HostError {
    /// Creates a not-found error.
    pub fn not_found(surface: impl std::fmt::Display) -> Self {
        Self::SurfaceNotFound(surface.to_string())
    }

    /// Creates a detached-surface error.
    pub fn detached(surface: impl std::fmt::Display) -> Self {
        Self::SurfaceDetached(surface.to_string())
    }
}
