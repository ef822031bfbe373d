//! Link geometry: cylindrical segments between consecutive frame origins.
//!
//! The whole segment set is thrown away and rebuilt on every pose update.
//! A rebuild never yields a mix of old and new segments, and the set is
//! never patched in place.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Canonical axis of a link primitive before orientation (`+Z`).
pub fn link_axis() -> Vector3<f64> {
    Vector3::z()
}

/// Displacements shorter than this are treated as zero-length links.
pub const DEFAULT_LINK_EPSILON: f64 = 1e-4;

/// `|dot|` at or beyond which the direction counts as (anti-)parallel.
const PARALLEL_DOT: f64 = 0.9999;

/// Rendering parameters for link primitives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkStyle {
    /// Radius of arm links (meters)
    pub radius: f64,

    /// Tool link radius as a fraction of `radius`
    pub tool_radius_scale: f64,

    /// Minimum link length that produces a segment (meters)
    pub epsilon: f64,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            radius: 0.03,
            tool_radius_scale: 0.8,
            epsilon: DEFAULT_LINK_EPSILON,
        }
    }
}

/// Which part of the arm a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Between two joint frames (or the base and the first frame)
    Arm,
    /// Between the last frame and the end-effector anchor
    Tool,
}

/// One rendered link primitive in world space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSegment {
    /// Index of the point pair this segment spans (`points[i] → points[i+1]`)
    pub pair: usize,
    pub kind: LinkKind,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    pub radius: f64,
    /// Midpoint of `start` and `end`
    pub center: Point3<f64>,
    /// Distance between `start` and `end`
    pub length: f64,
    /// Rotation taking the link axis onto the link direction
    pub rotation: UnitQuaternion<f64>,
}

impl LinkSegment {
    /// Unit direction from `start` to `end`.
    pub fn direction(&self) -> Vector3<f64> {
        (self.end - self.start) / self.length
    }
}

/// Rotation aligning the link axis with a unit direction.
///
/// Nearly parallel directions get no rotation. Nearly anti-parallel ones,
/// where the shortest arc has no defined axis, get a half turn about `+X`.
pub fn align_link_axis(direction: &Unit<Vector3<f64>>) -> UnitQuaternion<f64> {
    let dot = direction.dot(&link_axis());

    if dot >= PARALLEL_DOT {
        UnitQuaternion::identity()
    } else if dot <= -PARALLEL_DOT {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI)
    } else {
        UnitQuaternion::rotation_between(&link_axis(), direction.as_ref()).unwrap_or_else(UnitQuaternion::identity)
    }
}

/// Owns the current set of link segments and rebuilds it on demand.
#[derive(Debug, Clone, Default)]
pub struct LinkSynthesizer {
    style: LinkStyle,
    segments: Vec<LinkSegment>,
    skipped: usize,
    generation: u64,
}

impl LinkSynthesizer {
    pub fn new(style: LinkStyle) -> Self {
        Self {
            style,
            segments: Vec::new(),
            skipped: 0,
            generation: 0,
        }
    }

    /// Replaces every segment with ones built from `points`.
    ///
    /// `points` is the base origin, each frame origin, then the end-effector
    /// anchor. The last pair becomes the tool segment. Pairs closer than the
    /// style's epsilon produce nothing.
    pub fn rebuild(&mut self, points: &[Point3<f64>]) -> &[LinkSegment] {
        self.segments.clear();
        self.skipped = 0;
        self.generation += 1;

        let pair_count = points.len().saturating_sub(1);

        for (pair, window) in points.windows(2).enumerate() {
            let (start, end) = (window[0], window[1]);
            let displacement = end - start;
            let length = displacement.norm();

            if length < self.style.epsilon {
                self.skipped += 1;
                continue;
            }

            let kind = if pair + 1 == pair_count { LinkKind::Tool } else { LinkKind::Arm };
            let radius = match kind {
                LinkKind::Arm => self.style.radius,
                LinkKind::Tool => self.style.radius * self.style.tool_radius_scale,
            };
            let direction = Unit::new_unchecked(displacement / length);

            self.segments.push(LinkSegment {
                pair,
                kind,
                start,
                end,
                radius,
                center: start + displacement * 0.5,
                length,
                rotation: align_link_axis(&direction),
            });
        }

        &self.segments
    }

    pub fn segments(&self) -> &[LinkSegment] {
        &self.segments
    }

    /// Pairs skipped as zero-length by the last rebuild.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of rebuilds performed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn style(&self) -> &LinkStyle {
        &self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_segment_geometry() {
        let mut synth = LinkSynthesizer::new(LinkStyle::default());
        let segments = synth.rebuild(&[p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.2), p(0.2, 0.0, 0.2)]);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, LinkKind::Arm);
        assert_relative_eq!(segments[0].length, 0.2, epsilon = 1e-12);
        assert_relative_eq!(segments[0].center, p(0.0, 0.0, 0.1), epsilon = 1e-12);
        assert_relative_eq!(segments[0].radius, 0.03, epsilon = 1e-12);

        assert_eq!(segments[1].kind, LinkKind::Tool);
        assert_relative_eq!(segments[1].radius, 0.024, epsilon = 1e-12);
        assert_relative_eq!(segments[1].center, p(0.1, 0.0, 0.2), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_maps_axis_onto_direction() {
        let mut synth = LinkSynthesizer::new(LinkStyle::default());
        synth.rebuild(&[p(0.0, 0.0, 0.0), p(0.3, -0.4, 0.1)]);
        let segment = &synth.segments()[0];

        let rotated = segment.rotation * link_axis();
        assert_relative_eq!(rotated, segment.direction(), epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_direction_has_no_rotation() {
        let up = Unit::new_normalize(Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(align_link_axis(&up), UnitQuaternion::identity());
    }

    #[test]
    fn test_anti_parallel_direction_is_finite() {
        let down = Unit::new_normalize(Vector3::new(0.0, 0.0, -1.0));
        let rotation = align_link_axis(&down);

        let q = rotation.quaternion();
        assert!(q.coords.iter().all(|c| c.is_finite()));
        assert_relative_eq!(rotation * link_axis(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);

        // Slightly off anti-parallel still lands inside the fallback band
        let almost = Unit::new_normalize(Vector3::new(1e-6, 0.0, -1.0));
        assert!(align_link_axis(&almost).quaternion().coords.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_zero_length_pair_is_skipped() {
        let mut synth = LinkSynthesizer::new(LinkStyle::default());
        let full = synth
            .rebuild(&[p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.1), p(0.0, 0.1, 0.1), p(0.1, 0.1, 0.1)])
            .len();
        let collapsed = synth
            .rebuild(&[p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.1), p(0.0, 0.0, 0.10005), p(0.1, 0.0, 0.1)])
            .len();

        assert_eq!(full, 3);
        assert_eq!(collapsed, 2);
        assert_eq!(synth.skipped(), 1);
        assert_eq!(synth.segments()[1].pair, 2);
    }

    #[test]
    fn test_rebuild_discards_previous_set() {
        let mut synth = LinkSynthesizer::new(LinkStyle::default());
        synth.rebuild(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]);
        assert_eq!(synth.generation(), 1);

        synth.rebuild(&[p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0)]);
        assert!(synth.segments().is_empty());
        assert_eq!(synth.generation(), 2);
    }

    #[test]
    fn test_custom_epsilon() {
        let style = LinkStyle {
            epsilon: 0.05,
            ..Default::default()
        };
        let mut synth = LinkSynthesizer::new(style);
        assert!(synth.rebuild(&[p(0.0, 0.0, 0.0), p(0.0, 0.04, 0.0)]).is_empty());
    }
}
