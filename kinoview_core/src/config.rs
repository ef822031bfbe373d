//! Engine configuration.
//!
//! Everything has a default matching the deployed viewer, so an empty JSON
//! object (`{}`) is a valid configuration.

use crate::camera::CameraConfig;
use crate::dh::{DhTable, JointSpec, WristBias};
use crate::error::ConfigError;
use crate::links::LinkStyle;
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Slowest tick rate accepted; keeps the frame interval representable.
pub const MIN_REFRESH_HZ: f64 = 1e-3;

/// Top-level configuration for a `VisualizationEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub robot: RobotConfig,
    pub links: LinkStyle,
    pub camera: CameraConfig,
    pub render: RenderConfig,
    pub theme: Theme,

    /// Pose applied at construction (radians). Empty means all zeros.
    pub initial_pose: Vec<f64>,
}

impl EngineConfig {
    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let table = self.robot.dh_table()?;

        if self.robot.anchor_offset.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("robot.anchor_offset", "coordinates must be finite"));
        }
        if self.robot.base_translation.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("robot.base_translation", "coordinates must be finite"));
        }

        if !self.initial_pose.is_empty() && self.initial_pose.len() != table.len() {
            return Err(ConfigError::invalid(
                "initial_pose",
                format!("expected {} angles, got {}", table.len(), self.initial_pose.len()),
            ));
        }
        if self.initial_pose.iter().any(|a| !a.is_finite()) {
            return Err(ConfigError::invalid("initial_pose", "angles must be finite"));
        }

        if !(self.links.radius > 0.0) {
            return Err(ConfigError::invalid("links.radius", "must be positive"));
        }
        if !(self.links.tool_radius_scale > 0.0) {
            return Err(ConfigError::invalid("links.tool_radius_scale", "must be positive"));
        }
        if !(self.links.epsilon >= 0.0) {
            return Err(ConfigError::invalid("links.epsilon", "must be non-negative"));
        }

        let cam = &self.camera;
        if !(cam.fov_y_degrees > 0.0 && cam.fov_y_degrees < 180.0) {
            return Err(ConfigError::invalid("camera.fov_y_degrees", "must be in (0, 180)"));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(ConfigError::invalid("camera.near", "need 0 < near < far"));
        }
        if !(cam.min_distance > 0.0 && cam.max_distance >= cam.min_distance) {
            return Err(ConfigError::invalid(
                "camera.min_distance",
                "need 0 < min_distance <= max_distance",
            ));
        }
        if !(cam.damping_factor > 0.0 && cam.damping_factor <= 1.0) {
            return Err(ConfigError::invalid("camera.damping_factor", "must be in (0, 1]"));
        }
        if cam.eye.iter().chain(cam.target.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("camera.eye", "coordinates must be finite"));
        }

        if !(self.render.refresh_hz >= MIN_REFRESH_HZ && self.render.refresh_hz.is_finite()) {
            return Err(ConfigError::invalid(
                "render.refresh_hz",
                format!("must be finite and at least {}", MIN_REFRESH_HZ),
            ));
        }

        Ok(())
    }

    /// The pose applied at construction, expanded to the table length.
    pub fn initial_pose_for(&self, joint_count: usize) -> Vec<f64> {
        if self.initial_pose.is_empty() {
            vec![0.0; joint_count]
        } else {
            self.initial_pose.clone()
        }
    }

    /// Camera settings with the render-level damping switch applied.
    pub fn effective_camera(&self) -> CameraConfig {
        CameraConfig {
            enable_damping: self.camera.enable_damping && self.render.damping,
            ..self.camera.clone()
        }
    }
}

/// Robot geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Bias on the wrist joint of the built-in table
    pub wrist_bias: WristBias,

    /// Replaces the built-in Gen3 Lite table when set
    pub joints: Option<Vec<JointSpec>>,

    /// End-effector anchor, local to the last frame (meters)
    pub anchor_offset: [f64; 3],

    /// Translation of the base frame in the world (meters)
    pub base_translation: [f64; 3],
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wrist_bias: WristBias::default(),
            joints: None,
            anchor_offset: [0.0, 0.0, 0.025],
            base_translation: [0.0, 0.0, 0.0],
        }
    }
}

impl RobotConfig {
    /// Builds the joint table this robot uses.
    pub fn dh_table(&self) -> Result<DhTable, ConfigError> {
        match &self.joints {
            None => Ok(DhTable::kinova_gen3_lite(self.wrist_bias)),
            Some(joints) => DhTable::new(joints.clone()).ok_or_else(|| {
                ConfigError::invalid("robot.joints", "table must be non-empty with finite parameters")
            }),
        }
    }

    pub fn base_transform(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::from(self.base_translation))
    }

    pub fn anchor(&self) -> Vector3<f64> {
        Vector3::from(self.anchor_offset)
    }
}

/// Render loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tick rate of the dispatcher's frame clock
    pub refresh_hz: f64,

    /// Master switch for camera damping
    pub damping: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 60.0,
            damping: true,
        }
    }
}

impl RenderConfig {
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.refresh_hz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// RGBA colour.
pub type Color = [u8; 4];

const fn rgb(hex: u32) -> Color {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255]
}

/// Scene colours, resolved once per theme change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: Color,
    pub link: Color,
    pub base: Color,
    pub end_effector: Color,
    pub grid: Color,
    pub axis_x: Color,
    pub axis_y: Color,
    pub axis_z: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                background: rgb(0xf0f0f0),
                link: rgb(0xeeeeee),
                base: rgb(0x004444),
                end_effector: rgb(0x5555ff),
                grid: rgb(0x888888),
                axis_x: rgb(0xff0000),
                axis_y: rgb(0x00ff00),
                axis_z: rgb(0x0000ff),
            },
            Theme::Dark => Self {
                background: rgb(0x1e1e1e),
                link: rgb(0xb0b0b0),
                base: rgb(0x008888),
                end_effector: rgb(0x7777ff),
                grid: rgb(0x555555),
                axis_x: rgb(0xff4444),
                axis_y: rgb(0x44ff44),
                axis_z: rgb(0x4488ff),
            },
        }
    }
}
