//! In-memory display host for tests and the headless simulator.

use crate::{DisplayHost, HostError, SurfaceHandle, SurfaceId, Viewport};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy)]
struct SurfaceEntry {
    viewport: Viewport,
    generation: u64,
}

/// Display host backed by a plain map of surfaces.
///
/// Surfaces are registered up front and resized with `set_viewport`,
/// which is how tests and the simulator emulate a window resize.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    surfaces: RwLock<HashMap<SurfaceId, SurfaceEntry>>,
    next_generation: RwLock<u64>,
}

impl HeadlessHost {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped host with one registered surface.
    pub fn shared_with(id: impl Into<SurfaceId>, viewport: Viewport) -> Arc<Self> {
        let host = Self::new();
        host.register(id.into(), viewport);
        Arc::new(host)
    }

    /// Registers (or re-creates) a surface.
    pub fn register(&self, id: SurfaceId, viewport: Viewport) {
        let generation = {
            let mut next = self.next_generation.write().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        self.surfaces
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, SurfaceEntry { viewport, generation });
    }

    /// Removes a surface. Existing handles become detached.
    pub fn remove(&self, id: &SurfaceId) -> bool {
        self.surfaces
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some()
    }

    /// Changes the client size of a registered surface.
    pub fn set_viewport(&self, id: &SurfaceId, viewport: Viewport) -> Result<(), HostError> {
        let mut surfaces = self.surfaces.write().unwrap_or_else(|e| e.into_inner());
        let entry = surfaces.get_mut(id).ok_or_else(|| HostError::not_found(id))?;
        entry.viewport = viewport;
        Ok(())
    }

    /// Number of registered surfaces.
    pub fn surface_count(&self) -> usize {
        self.surfaces.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl DisplayHost for HeadlessHost {
    fn lookup(&self, id: &SurfaceId) -> Result<SurfaceHandle, HostError> {
        let surfaces = self.surfaces.read().unwrap_or_else(|e| e.into_inner());
        surfaces
            .get(id)
            .map(|entry| SurfaceHandle::new(id.clone(), entry.generation))
            .ok_or_else(|| HostError::not_found(id))
    }

    fn viewport(&self, surface: &SurfaceHandle) -> Result<Viewport, HostError> {
        let surfaces = self.surfaces.read().unwrap_or_else(|e| e.into_inner());
        match surfaces.get(surface.id()) {
            Some(entry) if entry.generation == surface.generation() => Ok(entry.viewport),
            _ => Err(HostError::detached(surface.id())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_registered_surface() {
        let host = HeadlessHost::new();
        host.register(SurfaceId::new("canvas"), Viewport::new(640, 480));

        let handle = host.lookup(&SurfaceId::new("canvas")).unwrap();
        assert_eq!(handle.id().as_str(), "canvas");
        assert_eq!(host.viewport(&handle).unwrap(), Viewport::new(640, 480));
    }

    #[test]
    fn test_lookup_missing_surface() {
        let host = HeadlessHost::new();
        let result = host.lookup(&SurfaceId::new("nope"));
        assert!(matches!(result, Err(HostError::SurfaceNotFound(_))));
    }

    #[test]
    fn test_set_viewport_is_visible_through_handle() {
        let host = HeadlessHost::new();
        let id = SurfaceId::new("canvas");
        host.register(id.clone(), Viewport::new(640, 480));
        let handle = host.lookup(&id).unwrap();

        host.set_viewport(&id, Viewport::new(1024, 256)).unwrap();
        assert_eq!(host.viewport(&handle).unwrap().aspect(), 4.0);
    }

    #[test]
    fn test_recreated_surface_detaches_old_handle() {
        let host = HeadlessHost::new();
        let id = SurfaceId::new("canvas");
        host.register(id.clone(), Viewport::new(640, 480));
        let stale = host.lookup(&id).unwrap();

        host.register(id.clone(), Viewport::new(640, 480));
        assert!(matches!(host.viewport(&stale), Err(HostError::SurfaceDetached(_))));

        assert!(host.remove(&id));
        assert_eq!(host.surface_count(), 0);
    }
}
