//! Denavit–Hartenberg joint parameters and the per-joint transform.
//!
//! Every joint of the chain is described by four scalars (classic DH):
//! twist `α`, link length `a`, link offset `d` and a joint-angle bias added
//! to the commanded angle. The joint's local transform is
//!
//! ```text
//! T = Rot_z(θ + bias) · Trans_z(d) · Trans_x(a) · Rot_x(α)
//! ```
//!
//! written out directly in closed form, so no intermediate matrix products
//! are needed.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Static geometric parameters of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    /// Twist angle α (radians)
    pub twist: f64,

    /// Link length a (meters)
    pub link_length: f64,

    /// Link offset d (meters)
    pub link_offset: f64,

    /// Bias added to the commanded joint angle (radians)
    pub angle_bias: f64,
}

impl JointSpec {
    pub fn new(twist: f64, link_length: f64, link_offset: f64, angle_bias: f64) -> Self {
        Self {
            twist,
            link_length,
            link_offset,
            angle_bias,
        }
    }

    /// Builds a spec from a datasheet row given in millimeters.
    pub fn from_millimeters(twist: f64, link_length_mm: f64, link_offset_mm: f64, angle_bias: f64) -> Self {
        Self::new(
            twist,
            crate::units::millimeters_to_meters(link_length_mm),
            crate::units::millimeters_to_meters(link_offset_mm),
            angle_bias,
        )
    }

    fn is_finite(&self) -> bool {
        self.twist.is_finite()
            && self.link_length.is_finite()
            && self.link_offset.is_finite()
            && self.angle_bias.is_finite()
    }
}

/// Classic DH transform of one joint at the given angle.
///
/// Accepts any real angle; there are no error conditions.
#[rustfmt::skip]
pub fn dh_transform(spec: &JointSpec, angle: f64) -> Matrix4<f64> {
    let (st, ct) = (angle + spec.angle_bias).sin_cos();
    let (sa, ca) = spec.twist.sin_cos();
    let a = spec.link_length;
    let d = spec.link_offset;

    Matrix4::new(
        ct, -st * ca,  st * sa, a * ct,
        st,  ct * ca, -ct * sa, a * st,
        0.0,      sa,       ca,      d,
        0.0,     0.0,      0.0,    1.0,
    )
}

/// Bias applied to the sixth (wrist) joint of the Gen3 Lite table.
///
/// The published parameter table lists `q6 + π/2`, while the zero-position
/// drawings imply `q6 + π`, and the viewer as deployed uses no bias at all.
/// The choice only rotates the tool frame about its own z-axis; positions
/// are identical for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WristBias {
    /// No bias (deployed viewer behaviour)
    #[default]
    Zero,
    /// `π/2`, as in the DH parameter table
    QuarterTurn,
    /// `π`, as in the zero-position diagram
    HalfTurn,
}

impl WristBias {
    /// The bias in radians.
    pub fn radians(self) -> f64 {
        match self {
            WristBias::Zero => 0.0,
            WristBias::QuarterTurn => FRAC_PI_2,
            WristBias::HalfTurn => PI,
        }
    }
}

/// Ordered (proximal → distal) table of joint parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DhTable {
    joints: Vec<JointSpec>,
}

impl DhTable {
    /// Creates a table from explicit joint specs.
    ///
    /// Returns `None` for an empty table or any non-finite parameter.
    pub fn new(joints: Vec<JointSpec>) -> Option<Self> {
        if joints.is_empty() || !joints.iter().all(JointSpec::is_finite) {
            return None;
        }
        Some(Self { joints })
    }

    /// Kinova Gen3 Lite, classic DH, dimensions converted from millimeters.
    pub fn kinova_gen3_lite(wrist_bias: WristBias) -> Self {
        let joints = vec![
            JointSpec::from_millimeters(FRAC_PI_2, 0.0, 128.3 + 115.0, 0.0),
            JointSpec::from_millimeters(PI, 280.0, 30.0, FRAC_PI_2),
            JointSpec::from_millimeters(FRAC_PI_2, 0.0, 20.0, FRAC_PI_2),
            JointSpec::from_millimeters(FRAC_PI_2, 0.0, 140.0 + 105.0, FRAC_PI_2),
            JointSpec::from_millimeters(FRAC_PI_2, 0.0, 28.5 + 28.5, PI),
            JointSpec::from_millimeters(0.0, 0.0, 105.0 + 130.0, wrist_bias.radians()),
        ];
        Self { joints }
    }

    /// Number of joints.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint(&self, index: usize) -> Option<&JointSpec> {
        self.joints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointSpec> {
        self.joints.iter()
    }

    /// Local transforms of every joint for the given angles.
    ///
    /// `angles` must have the table's length; extra or missing entries are
    /// the caller's responsibility (the frame hierarchy validates first).
    pub fn local_transforms<'a>(&'a self, angles: &'a [f64]) -> impl Iterator<Item = Matrix4<f64>> + 'a {
        self.joints
            .iter()
            .zip(angles.iter())
            .map(|(spec, &angle)| dh_transform(spec, angle))
    }
}

impl Default for DhTable {
    fn default() -> Self {
        Self::kinova_gen3_lite(WristBias::default())
    }
}
