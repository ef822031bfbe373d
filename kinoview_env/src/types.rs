//! Common types for the Kinoview host abstraction.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a display surface, resolved by the host.
///
/// In a browser host this is the container element id; in the headless
/// host it is just a registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(String);

impl SurfaceId {
    /// Creates a surface identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Size of a display surface in CSS/logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in logical pixels
    pub width: u32,

    /// Height in logical pixels
    pub height: u32,

    /// Device pixel ratio (physical pixels per logical pixel)
    pub pixel_ratio: f64,
}

impl Viewport {
    /// Creates a viewport with a pixel ratio of 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    /// Sets the device pixel ratio.
    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Returns `width / height`.
    ///
    /// A zero-height viewport is treated as one pixel tall so the ratio
    /// stays finite.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size of the backing buffer in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.pixel_ratio).round() as u32,
            (self.height as f64 * self.pixel_ratio).round() as u32,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_aspect() {
        assert_eq!(Viewport::new(800, 400).aspect(), 2.0);
        assert_eq!(Viewport::new(300, 0).aspect(), 300.0);
    }

    #[test]
    fn test_viewport_physical_size() {
        let vp = Viewport::new(640, 480).with_pixel_ratio(2.0);
        assert_eq!(vp.physical_size(), (1280, 960));
    }

    #[test]
    fn test_surface_id_display() {
        let id = SurfaceId::from("robot-visualization-container");
        assert_eq!(id.to_string(), "robot-visualization-container");
    }
}
