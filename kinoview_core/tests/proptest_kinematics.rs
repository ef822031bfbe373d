//! Property-based tests for the pose update pipeline.
//!
//! Run with: cargo test -p kinoview_core -- proptest

use approx::relative_eq;
use kinoview_core::{
    dh_transform, EngineConfig, LinkKind, RecordingRenderer, VisualizationEngine, WristBias,
};
use kinoview_env::{HeadlessHost, SurfaceId, Viewport};
use nalgebra::{Matrix4, Vector3};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Any real angle, well outside one turn in both directions.
fn arb_angle() -> impl Strategy<Value = f64> {
    -20.0..20.0f64
}

fn arb_pose() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_angle(), 6)
}

fn arb_wrist_bias() -> impl Strategy<Value = WristBias> {
    prop_oneof![
        Just(WristBias::Zero),
        Just(WristBias::QuarterTurn),
        Just(WristBias::HalfTurn),
    ]
}

fn engine(bias: WristBias) -> VisualizationEngine {
    let surface = "proptest";
    let host = HeadlessHost::shared_with(surface, Viewport::new(640, 480));
    let mut config = EngineConfig::default();
    config.robot.wrist_bias = bias;
    VisualizationEngine::new(host, &SurfaceId::new(surface), config, Box::new(RecordingRenderer::new()))
        .expect("headless surface is registered")
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// world(i) is the product of every DH transform from the base to i.
    #[test]
    fn proptest_chain_composition(pose in arb_pose(), bias in arb_wrist_bias()) {
        let mut engine = engine(bias);
        engine.update_pose(&pose).unwrap();

        let mut expected = Matrix4::identity();
        for (i, spec) in engine.frames().table().iter().enumerate() {
            expected *= dh_transform(spec, pose[i]);
            let world = engine.frames().node(i).unwrap().world_transform();
            prop_assert!(relative_eq!(*world, expected, epsilon = 1e-9));
        }
        prop_assert!(engine.frames().composition_residual() < 1e-12);
    }

    /// Applying the same pose twice gives identical frames and segments.
    #[test]
    fn proptest_update_idempotent(first in arb_pose(), pose in arb_pose()) {
        let mut engine = engine(WristBias::Zero);
        engine.update_pose(&first).unwrap();
        engine.update_pose(&pose).unwrap();
        let before = engine.snapshot();

        engine.update_pose(&pose).unwrap();
        let after = engine.snapshot();

        for (a, b) in before.frame_origins.iter().zip(after.frame_origins.iter()) {
            prop_assert!(relative_eq!(*a, *b, epsilon = 1e-9));
        }
        prop_assert_eq!(before.segments, after.segments);
    }

    /// Every segment is finite and its rotation carries +Z onto its direction.
    #[test]
    fn proptest_segments_well_formed(pose in arb_pose()) {
        let mut engine = engine(WristBias::Zero);
        engine.update_pose(&pose).unwrap();

        let links = engine.links();
        prop_assert!(!links.is_empty());
        prop_assert!(links.len() <= 7);
        prop_assert_eq!(links.iter().filter(|s| s.kind == LinkKind::Tool).count(), 1);

        for segment in links {
            prop_assert!(segment.length >= 1e-4);
            prop_assert!(segment.rotation.quaternion().coords.iter().all(|c| c.is_finite()));
            // Within the parallel band the rotation snaps to identity or a half turn
            let mapped = segment.rotation * Vector3::z();
            prop_assert!(mapped.dot(&segment.direction()) >= 0.9999 - 1e-12);
        }
    }

    /// The anchor never leaves the arm's total reach.
    #[test]
    fn proptest_anchor_reach_is_bounded(pose in arb_pose()) {
        let mut engine = engine(WristBias::Zero);
        engine.update_pose(&pose).unwrap();

        // Sum of every |a| and |d| in the table plus the anchor offset
        let reach: f64 = engine
            .frames()
            .table()
            .iter()
            .map(|s| s.link_length.abs() + s.link_offset.abs())
            .sum::<f64>()
            + 0.025;
        let anchor = engine.frames().anchor_world();
        prop_assert!(anchor.coords.norm() <= reach + 1e-9);
    }

    /// Rejected input never changes the scene.
    #[test]
    fn proptest_invalid_input_is_inert(pose in arb_pose(), len in 0usize..12, nan_at in 0usize..6) {
        let mut engine = engine(WristBias::Zero);
        engine.update_pose(&pose).unwrap();
        let before = engine.snapshot();

        if len != 6 {
            prop_assert!(engine.update_pose(&vec![0.1; len]).is_err());
        }
        let mut poisoned = pose.clone();
        poisoned[nan_at] = f64::NAN;
        prop_assert!(engine.update_pose(&poisoned).is_err());

        prop_assert_eq!(before, engine.snapshot());
    }
}
