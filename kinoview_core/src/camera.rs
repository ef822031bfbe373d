//! Orbit camera rig.
//!
//! The camera orbits a target point on a sphere (Z is up), with damped
//! motion, bounded zoom and screen-space panning switched off so the robot
//! base stays the visual anchor. Nothing in here knows about the kinematic
//! chain; resizing only touches aspect ratio and viewport.

use kinoview_env::Viewport;
use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_8, PI};

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLE_EPSILON: f64 = 1e-6;

/// Below this the camera is considered to have stopped moving.
const SETTLE_EPSILON: f64 = 1e-6;

/// Static camera and control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view (degrees)
    pub fov_y_degrees: f64,
    pub near: f64,
    pub far: f64,

    /// Initial eye position
    pub eye: [f64; 3],
    /// Initial orbit target
    pub target: [f64; 3],

    /// Smooth orbiting: each tick applies `damping_factor` of the pending motion
    pub enable_damping: bool,
    pub damping_factor: f64,

    /// Zoom bounds (distance from target, meters)
    pub min_distance: f64,
    pub max_distance: f64,

    /// Panning moves the target; off by default
    pub enable_pan: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        // Start below and in front of the arm, then swing π/8 around Z
        let eye = Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_8) * Point3::new(0.0, -1.5, 1.5);

        Self {
            fov_y_degrees: 50.0,
            near: 0.1,
            far: 100.0,
            eye: [eye.x, eye.y, eye.z],
            target: [0.0, 0.0, 0.5],
            enable_damping: true,
            damping_factor: 0.1,
            min_distance: 0.5,
            max_distance: 10.0,
            enable_pan: false,
        }
    }
}

/// Eye offset from the target in spherical coordinates (Z-up).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f64,
    /// Azimuth around +Z, from +X
    theta: f64,
    /// Polar angle from +Z
    phi: f64,
}

impl Spherical {
    fn from_offset(offset: &Vector3<f64>) -> Self {
        let radius = offset.norm();
        if radius < f64::EPSILON {
            return Self { radius: 0.0, theta: 0.0, phi: 0.0 };
        }
        Self {
            radius,
            theta: offset.y.atan2(offset.x),
            phi: (offset.z / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f64> {
        let (sp, cp) = self.phi.sin_cos();
        let (st, ct) = self.theta.sin_cos();
        Vector3::new(self.radius * sp * ct, self.radius * sp * st, self.radius * cp)
    }
}

/// Camera state plus the orbit controller acting on it.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    config: CameraConfig,
    eye: Point3<f64>,
    target: Point3<f64>,
    up: Unit<Vector3<f64>>,
    aspect: f64,
    viewport: Viewport,

    // Pending motion not yet applied by `update`
    delta_theta: f64,
    delta_phi: f64,
    zoom_scale: f64,
}

impl OrbitCamera {
    pub fn new(config: CameraConfig, viewport: Viewport) -> Self {
        let mut camera = Self {
            eye: Point3::from(config.eye),
            target: Point3::from(config.target),
            up: Vector3::z_axis(),
            aspect: viewport.aspect(),
            viewport,
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom_scale: 1.0,
            config,
        };
        // Snap the initial placement into the zoom bounds
        camera.update();
        camera
    }

    /// Queues an orbit: `azimuth` around the up axis, `polar` toward it.
    ///
    /// With damping on, the motion is spread over subsequent `update` calls;
    /// otherwise it is applied immediately.
    pub fn orbit(&mut self, azimuth: f64, polar: f64) {
        self.delta_theta += azimuth;
        self.delta_phi += polar;
        if !self.config.enable_damping {
            self.update();
        }
    }

    /// Scales the distance to the target by `factor` (> 1 moves away).
    pub fn zoom(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom_scale *= factor;
        }
        if !self.config.enable_damping {
            self.update();
        }
    }

    /// Moves eye and target together in the ground plane.
    ///
    /// Returns false and does nothing while panning is disabled.
    pub fn pan(&mut self, right: f64, forward: f64) -> bool {
        if !self.config.enable_pan {
            tracing::trace!("pan ignored: panning disabled");
            return false;
        }

        let view_dir = self.target - self.eye;
        let flat_forward = Vector3::new(view_dir.x, view_dir.y, 0.0);
        let Some(forward_dir) = flat_forward.try_normalize(f64::EPSILON) else {
            return false;
        };
        let right_dir = forward_dir.cross(&self.up);

        let shift = right_dir * right + forward_dir * forward;
        self.eye += shift;
        self.target += shift;
        true
    }

    /// Applies pending orbit/zoom motion. Returns true if the eye moved.
    ///
    /// Called once per render tick when damping is enabled.
    pub fn update(&mut self) -> bool {
        let offset = self.eye - self.target;
        let mut spherical = Spherical::from_offset(&offset);

        let step = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.delta_theta * step;
        spherical.phi = (spherical.phi + self.delta_phi * step).clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius = (spherical.radius * self.zoom_scale)
            .clamp(self.config.min_distance, self.config.max_distance);

        let new_eye = self.target + spherical.to_offset();
        let moved = (new_eye - self.eye).norm();
        self.eye = new_eye;

        if self.config.enable_damping {
            self.delta_theta *= 1.0 - self.config.damping_factor;
            self.delta_phi *= 1.0 - self.config.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.zoom_scale = 1.0;

        moved > SETTLE_EPSILON
    }

    /// Updates aspect ratio and viewport for a new surface size.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.aspect = viewport.aspect();
    }

    /// True once no pending motion remains.
    pub fn is_settled(&self) -> bool {
        self.delta_theta.abs() < SETTLE_EPSILON
            && self.delta_phi.abs() < SETTLE_EPSILON
            && (self.zoom_scale - 1.0).abs() < SETTLE_EPSILON
    }

    pub fn eye(&self) -> Point3<f64> {
        self.eye
    }

    pub fn target(&self) -> Point3<f64> {
        self.target
    }

    pub fn up(&self) -> &Unit<Vector3<f64>> {
        &self.up
    }

    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn distance(&self) -> f64 {
        (self.eye - self.target).norm()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn damping_enabled(&self) -> bool {
        self.config.enable_damping
    }

    /// World → camera transform.
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Isometry3::look_at_rh(&self.eye, &self.target, &self.up).to_homogeneous()
    }

    /// Camera → clip transform.
    pub fn projection_matrix(&self) -> Matrix4<f64> {
        Perspective3::new(
            self.aspect,
            self.config.fov_y_degrees.to_radians(),
            self.config.near,
            self.config.far,
        )
        .to_homogeneous()
    }

    pub fn view_projection(&self) -> Matrix4<f64> {
        self.projection_matrix() * self.view_matrix()
    }
}
