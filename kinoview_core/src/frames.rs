//! The frame hierarchy: one output frame per joint, chained from the base.
//!
//! Nodes live in a flat arena (`Vec<FrameNode>`) and refer to each other by
//! index, so there are no owning parent/child references and teardown is a
//! plain drop. In the manipulator chain every node has exactly one child
//! except the last, but propagation walks the arena as a general tree.
//!
//! # Invariant
//!
//! After every accepted pose update, for every node `i`:
//!
//! ```text
//! world(i) = world(parent(i)) · local(i)
//! ```
//!
//! World transforms are recomputed in full from the base on every update;
//! nothing is patched incrementally, so no drift can accumulate.

use crate::dh::DhTable;
use crate::error::EngineError;
use nalgebra::{Matrix4, Point3, Vector3};

/// Parent of a frame node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameParent {
    /// Attached directly to the fixed base frame
    Base,
    /// Attached to another node in the arena
    Node(usize),
}

/// One joint's output frame.
#[derive(Debug, Clone)]
pub struct FrameNode {
    name: String,
    parent: FrameParent,
    children: Vec<usize>,
    local: Matrix4<f64>,
    world: Matrix4<f64>,
}

impl FrameNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> FrameParent {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Transform relative to the parent frame.
    pub fn local_transform(&self) -> &Matrix4<f64> {
        &self.local
    }

    /// Transform relative to the world (derived).
    pub fn world_transform(&self) -> &Matrix4<f64> {
        &self.world
    }

    /// Origin of this frame in world coordinates.
    pub fn world_origin(&self) -> Point3<f64> {
        translation_of(&self.world)
    }
}

/// Checks a joint-angle vector against the expected joint count.
pub fn validate_pose(angles: &[f64], joint_count: usize) -> Result<(), EngineError> {
    if angles.len() != joint_count {
        return Err(EngineError::invalid_input(format!(
            "expected {} joint angles, got {}",
            joint_count,
            angles.len()
        )));
    }

    if let Some((index, value)) = angles.iter().enumerate().find(|(_, a)| !a.is_finite()) {
        return Err(EngineError::invalid_input(format!(
            "joint {} angle is not finite ({})",
            index + 1,
            value
        )));
    }

    Ok(())
}

/// Arena-backed chain of joint frames.
#[derive(Debug, Clone)]
pub struct FrameHierarchy {
    table: DhTable,
    base: Matrix4<f64>,
    nodes: Vec<FrameNode>,
    /// Nodes attached directly to the base
    roots: Vec<usize>,
    /// End-effector anchor, local to the last node
    anchor: Vector3<f64>,
}

impl FrameHierarchy {
    /// Builds the chain for a joint table. Every frame starts at the base
    /// pose with an identity local transform.
    pub fn new(table: DhTable, base: Matrix4<f64>, anchor: Vector3<f64>) -> Self {
        let count = table.len();
        let nodes = (0..count)
            .map(|i| FrameNode {
                name: format!("Frame_{}", i + 1),
                parent: if i == 0 { FrameParent::Base } else { FrameParent::Node(i - 1) },
                children: if i + 1 < count { vec![i + 1] } else { Vec::new() },
                local: Matrix4::identity(),
                world: base,
            })
            .collect();

        Self {
            table,
            base,
            nodes,
            roots: if count > 0 { vec![0] } else { Vec::new() },
            anchor,
        }
    }

    /// Applies a joint-angle vector.
    ///
    /// Rejects wrong-length or non-finite input with `InvalidInput` before
    /// touching any node.
    pub fn update_pose(&mut self, angles: &[f64]) -> Result<(), EngineError> {
        validate_pose(angles, self.table.len())?;

        for (node, local) in self.nodes.iter_mut().zip(self.table.local_transforms(angles)) {
            node.local = local;
        }

        self.propagate();
        Ok(())
    }

    /// Pre-order traversal from the base recomputing every world transform.
    fn propagate(&mut self) {
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(index) = stack.pop() {
            let parent_world = match self.nodes[index].parent {
                FrameParent::Base => self.base,
                FrameParent::Node(parent) => self.nodes[parent].world,
            };

            let node = &mut self.nodes[index];
            node.world = parent_world * node.local;
            stack.extend(node.children.iter().rev().copied());
        }
    }

    pub fn table(&self) -> &DhTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<&FrameNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[FrameNode] {
        &self.nodes
    }

    /// World transform of the fixed base frame.
    pub fn base_transform(&self) -> &Matrix4<f64> {
        &self.base
    }

    /// World transform of a node's parent.
    pub fn parent_world(&self, index: usize) -> Option<&Matrix4<f64>> {
        match self.nodes.get(index)?.parent {
            FrameParent::Base => Some(&self.base),
            FrameParent::Node(parent) => self.nodes.get(parent).map(|n| &n.world),
        }
    }

    /// Local offset of the end-effector anchor on the last frame.
    pub fn anchor_offset(&self) -> &Vector3<f64> {
        &self.anchor
    }

    /// End-effector anchor in world coordinates.
    pub fn anchor_world(&self) -> Point3<f64> {
        let last = self.nodes.last().map_or(&self.base, |n| &n.world);
        last.transform_point(&Point3::from(self.anchor))
    }

    /// Ordered world points for link synthesis: the base origin, every
    /// frame origin, then the end-effector anchor (N + 2 points).
    pub fn world_points(&self) -> Vec<Point3<f64>> {
        let mut points = Vec::with_capacity(self.nodes.len() + 2);
        points.push(translation_of(&self.base));
        points.extend(self.nodes.iter().map(FrameNode::world_origin));
        points.push(self.anchor_world());
        points
    }

    /// Largest element-wise deviation from `world = parent.world · local`
    /// over all nodes. Zero (up to rounding) after every accepted update.
    pub fn composition_residual(&self) -> f64 {
        (0..self.nodes.len())
            .filter_map(|i| {
                let parent = self.parent_world(i)?;
                let node = &self.nodes[i];
                Some((parent * node.local - node.world).amax())
            })
            .fold(0.0, f64::max)
    }
}

fn translation_of(m: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dh::{dh_transform, JointSpec, WristBias};
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn gen3_lite() -> FrameHierarchy {
        FrameHierarchy::new(
            DhTable::kinova_gen3_lite(WristBias::Zero),
            Matrix4::identity(),
            Vector3::new(0.0, 0.0, 0.025),
        )
    }

    #[test]
    fn test_chain_topology() {
        let frames = gen3_lite();
        assert_eq!(frames.len(), 6);
        assert_eq!(frames.node(0).unwrap().parent(), FrameParent::Base);
        assert_eq!(frames.node(3).unwrap().parent(), FrameParent::Node(2));
        assert_eq!(frames.node(3).unwrap().children(), &[4]);
        assert!(frames.node(5).unwrap().children().is_empty());
        assert_eq!(frames.node(5).unwrap().name(), "Frame_6");
    }

    #[test]
    fn test_zero_pose_reference_positions() {
        let mut frames = gen3_lite();
        frames.update_pose(&[0.0; 6]).unwrap();

        let expected = [
            [0.0, 0.0, 0.2433],
            [0.0, -0.03, 0.5233],
            [0.0, -0.01, 0.5233],
            [0.0, -0.01, 0.7683],
            [0.057, -0.01, 0.7683],
            [0.057, -0.01, 1.0033],
        ];
        for (node, want) in frames.nodes().iter().zip(expected.iter()) {
            let origin = node.world_origin();
            assert_relative_eq!(origin.x, want[0], epsilon = 1e-9);
            assert_relative_eq!(origin.y, want[1], epsilon = 1e-9);
            assert_relative_eq!(origin.z, want[2], epsilon = 1e-9);
        }

        // x = d5, y = d3 - d2, z = d1 + a2 + d4 + d6 + anchor
        let anchor = frames.anchor_world();
        assert_relative_eq!(anchor.x, 0.057, epsilon = 1e-9);
        assert_relative_eq!(anchor.y, -0.010, epsilon = 1e-9);
        assert_relative_eq!(anchor.z, 0.2433 + 0.28 + 0.245 + 0.235 + 0.025, epsilon = 1e-9);
    }

    #[test]
    fn test_composition_law() {
        let mut frames = gen3_lite();
        frames.update_pose(&[0.3, -1.2, 2.0, 0.5, -0.7, 3.0]).unwrap();

        for i in 0..frames.len() {
            let node = frames.node(i).unwrap();
            let expected = frames.parent_world(i).unwrap() * node.local_transform();
            assert_relative_eq!(*node.world_transform(), expected, epsilon = 1e-12);
        }
        assert!(frames.composition_residual() < 1e-12);
    }

    #[test]
    fn test_base_transform_roots_the_chain() {
        let base = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let table = DhTable::new(vec![JointSpec::new(0.0, 0.5, 0.0, 0.0)]).unwrap();
        let mut frames = FrameHierarchy::new(table, base, Vector3::zeros());
        frames.update_pose(&[FRAC_PI_2]).unwrap();

        let origin = frames.node(0).unwrap().world_origin();
        assert_relative_eq!(origin, Point3::new(1.0, 2.5, 3.0), epsilon = 1e-12);
        assert_eq!(frames.world_points().len(), 3);
    }

    #[test]
    fn test_repeated_updates_do_not_drift() {
        let mut frames = gen3_lite();
        let pose = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        frames.update_pose(&pose).unwrap();
        let first: Vec<_> = frames.nodes().iter().map(|n| *n.world_transform()).collect();

        for _ in 0..1000 {
            frames.update_pose(&[PI, -PI, PI, -PI, PI, -PI]).unwrap();
            frames.update_pose(&pose).unwrap();
        }

        for (node, before) in frames.nodes().iter().zip(first.iter()) {
            assert_relative_eq!(*node.world_transform(), *before, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_pose_leaves_state_unchanged() {
        let mut frames = gen3_lite();
        frames.update_pose(&[0.5; 6]).unwrap();
        let before: Vec<_> = frames.nodes().iter().map(|n| *n.world_transform()).collect();

        assert!(matches!(
            frames.update_pose(&[0.0; 5]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            frames.update_pose(&[0.0, 0.0, 0.0, 0.0, 0.0, f64::NAN]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            frames.update_pose(&[0.0, f64::INFINITY, 0.0, 0.0, 0.0, 0.0]),
            Err(EngineError::InvalidInput(_))
        ));

        for (node, b) in frames.nodes().iter().zip(before.iter()) {
            assert_eq!(node.world_transform(), b);
        }
    }

    #[test]
    fn test_local_transforms_come_from_dh() {
        let mut frames = gen3_lite();
        let pose = [0.4, 0.3, 0.2, 0.1, 0.0, -0.1];
        frames.update_pose(&pose).unwrap();

        for (i, spec) in frames.table().iter().enumerate() {
            assert_eq!(*frames.node(i).unwrap().local_transform(), dh_transform(spec, pose[i]));
        }
    }
}
