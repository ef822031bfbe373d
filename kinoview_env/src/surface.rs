//! Display surface abstraction.

use crate::{HostError, SurfaceId, Viewport};

/// A resolved display surface.
///
/// Handles are cheap to clone and only carry the identifier plus a
/// host-assigned generation, so a host can tell a stale handle from a
/// re-created surface with the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    id: SurfaceId,
    generation: u64,
}

impl SurfaceHandle {
    /// Creates a handle. Only hosts should need this.
    pub fn new(id: SurfaceId, generation: u64) -> Self {
        Self { id, generation }
    }

    /// The identifier this handle was resolved from.
    pub fn id(&self) -> &SurfaceId {
        &self.id
    }

    /// Host-assigned generation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The host environment that owns display surfaces.
///
/// # Implementations
///
/// - **Headless**: `HeadlessHost` - in-memory registry, used by tests and the simulator
/// - **Windowed**: provided by the embedding application
pub trait DisplayHost: Send + Sync {
    /// Resolves a surface identifier to a live surface.
    ///
    /// Fails with `HostError::SurfaceNotFound` if nothing is registered
    /// under `id`.
    fn lookup(&self, id: &SurfaceId) -> Result<SurfaceHandle, HostError>;

    /// Returns the current client size of a surface.
    ///
    /// Called synchronously on every resize; hosts must answer from cached
    /// state without blocking.
    fn viewport(&self, surface: &SurfaceHandle) -> Result<Viewport, HostError>;
}
