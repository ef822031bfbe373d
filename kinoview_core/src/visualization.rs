//! Rerun.io scene renderer.
//!
//! Draws the arm the way the web viewer did: a ground grid, thick world
//! axes, a short base platform, capsule links and a small end-effector
//! cube. Each frame is logged on the `frame` timeline.
//!
//! Enable with the `visualization` feature flag.

use crate::config::{Color, Palette};
use crate::error::RenderError;
use crate::links::LinkKind;
use crate::render::{RenderFrame, SceneRenderer};
use kinoview_env::Viewport;
use rerun::{RecordingStream, RecordingStreamBuilder};

const GRID_SIZE: f32 = 2.0;
const GRID_DIVISIONS: usize = 10;
const WORLD_AXIS_LENGTH: f32 = 0.5;
const WORLD_AXIS_RADIUS: f32 = 0.005;
const BASE_RADIUS: f32 = 0.05;
const BASE_HEIGHT: f32 = 0.06;
const END_EFFECTOR_SIZE: f32 = 0.05;
const FRAME_AXIS_LENGTH: f32 = 0.05;

fn backend(err: impl std::fmt::Display) -> RenderError {
    RenderError::backend(err.to_string())
}

fn f32x3(p: &nalgebra::Point3<f64>) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}

/// Renderer that streams the scene to a Rerun viewer or `.rrd` file.
pub struct RerunRenderer {
    rec: RecordingStream,
    viewport: Option<Viewport>,
    /// Palette the static context was last drawn with
    static_palette: Option<Palette>,
}

impl RerunRenderer {
    /// Spawns a Rerun viewer and streams to it.
    pub fn spawn(app_id: &str) -> Result<Self, RenderError> {
        let rec = RecordingStreamBuilder::new(app_id).spawn().map_err(backend)?;
        Self::from_stream(rec)
    }

    /// Records to an `.rrd` file instead of a live viewer.
    pub fn save(app_id: &str, path: &str) -> Result<Self, RenderError> {
        let rec = RecordingStreamBuilder::new(app_id).save(path).map_err(backend)?;
        Self::from_stream(rec)
    }

    pub fn from_stream(rec: RecordingStream) -> Result<Self, RenderError> {
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())
            .map_err(backend)?;
        Ok(Self {
            rec,
            viewport: None,
            static_palette: None,
        })
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Grid, world axes and base platform. Redrawn only when the palette changes.
    fn log_static_scene(&self, palette: &Palette) -> Result<(), RenderError> {
        let half = GRID_SIZE / 2.0;
        let step = GRID_SIZE / GRID_DIVISIONS as f32;
        let mut lines = Vec::with_capacity(2 * (GRID_DIVISIONS + 1));
        for i in 0..=GRID_DIVISIONS {
            let c = -half + i as f32 * step;
            lines.push(vec![[c, -half, 0.0], [c, half, 0.0]]);
            lines.push(vec![[-half, c, 0.0], [half, c, 0.0]]);
        }
        self.rec
            .log_static(
                "world/grid",
                &rerun::LineStrips3D::new(lines).with_colors([palette.grid]),
            )
            .map_err(backend)?;

        self.rec
            .log_static(
                "world/axes",
                &rerun::Arrows3D::from_vectors([
                    [WORLD_AXIS_LENGTH, 0.0, 0.0],
                    [0.0, WORLD_AXIS_LENGTH, 0.0],
                    [0.0, 0.0, WORLD_AXIS_LENGTH],
                ])
                .with_radii([WORLD_AXIS_RADIUS])
                .with_colors([palette.axis_x, palette.axis_y, palette.axis_z]),
            )
            .map_err(backend)?;

        // Platform sits just below the z = 0 plane
        self.rec
            .log_static(
                "world/base",
                &rerun::Cylinders3D::from_lengths_and_radii([BASE_HEIGHT], [BASE_RADIUS])
                    .with_centers([[0.0, 0.0, -BASE_HEIGHT / 2.0]])
                    .with_colors([palette.base])
                    .with_fill_mode(rerun::FillMode::Solid),
            )
            .map_err(backend)?;

        Ok(())
    }

    fn log_links(&self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
        let segments = frame.segments;
        let lengths: Vec<f32> = segments.iter().map(|s| s.length as f32).collect();
        let radii: Vec<f32> = segments.iter().map(|s| s.radius as f32).collect();
        let starts: Vec<[f32; 3]> = segments.iter().map(|s| f32x3(&s.start)).collect();
        let rotations: Vec<rerun::Quaternion> = segments
            .iter()
            .map(|s| {
                let q = s.rotation.as_ref();
                rerun::Quaternion::from_xyzw([q.i as f32, q.j as f32, q.k as f32, q.w as f32])
            })
            .collect();
        let colors: Vec<Color> = segments
            .iter()
            .map(|s| match s.kind {
                LinkKind::Arm => frame.palette.link,
                LinkKind::Tool => frame.palette.end_effector,
            })
            .collect();

        // Capsules extend along +Z from their translation, same as the link axis
        self.rec
            .log(
                "world/robot/links",
                &rerun::Capsules3D::from_lengths_and_radii(lengths, radii)
                    .with_translations(starts)
                    .with_quaternions(rotations)
                    .with_colors(colors),
            )
            .map_err(backend)
    }

    fn log_frames(&self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
        let mut origins = Vec::new();
        let mut vectors = Vec::new();
        let mut colors = Vec::new();
        let axis_colors = [frame.palette.axis_x, frame.palette.axis_y, frame.palette.axis_z];

        for node in frame.frames.nodes() {
            let world = node.world_transform();
            let origin = f32x3(&node.world_origin());
            for (axis, color) in axis_colors.iter().enumerate() {
                origins.push(origin);
                vectors.push([
                    world[(0, axis)] as f32 * FRAME_AXIS_LENGTH,
                    world[(1, axis)] as f32 * FRAME_AXIS_LENGTH,
                    world[(2, axis)] as f32 * FRAME_AXIS_LENGTH,
                ]);
                colors.push(*color);
            }
        }

        self.rec
            .log(
                "world/robot/frames",
                &rerun::Arrows3D::from_vectors(vectors)
                    .with_origins(origins)
                    .with_colors(colors),
            )
            .map_err(backend)
    }
}

impl SceneRenderer for RerunRenderer {
    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
        if self.static_palette.as_ref() != Some(frame.palette) {
            self.log_static_scene(frame.palette)?;
            self.static_palette = Some(*frame.palette);
        }

        self.rec.set_time_sequence("frame", frame.index as i64);

        self.log_links(frame)?;
        self.log_frames(frame)?;

        self.rec
            .log(
                "world/robot/end_effector",
                &rerun::Boxes3D::from_centers_and_sizes(
                    [f32x3(&frame.anchor)],
                    [[END_EFFECTOR_SIZE; 3]],
                )
                .with_colors([frame.palette.end_effector])
                .with_fill_mode(rerun::FillMode::Solid),
            )
            .map_err(backend)?;

        self.rec
            .log(
                "world/camera/eye",
                &rerun::Points3D::new([f32x3(&frame.camera.eye())]).with_radii([0.02]),
            )
            .map_err(backend)?;

        Ok(())
    }
}
