//! Scenario runner - plays a pose stream through the dispatcher and checks
//! the scene after every step.

use crate::context::SimContext;
use crate::error::ScenarioError;
use crate::exporter::{ExportFrame, SceneExport};
use crate::scenarios::{ScenarioId, Step};

use kinoview_core::{
    run_engine, DispatchSummary, EngineCommand, EngineConfig, EngineError, LinkKind, RecordingRenderer,
    SceneSnapshot, VisualizationEngine,
};
use kinoview_env::{FrameClock, HeadlessHost, SurfaceId, Viewport};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SURFACE: &str = "robot-visualization-container";

/// Largest tolerated deviation from the chain composition law.
const COMPOSITION_TOLERANCE: f64 = 1e-9;

/// Tolerance against the kinematics service's reported positions (meters).
const REFERENCE_TOLERANCE: f64 = 1e-3;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario: ScenarioId,
    pub seed: u64,

    /// Whether every check passed
    pub passed: bool,

    /// Steps executed
    pub steps: usize,

    /// Dispatcher counters
    pub dispatch: DispatchSummary,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// First failed check, if any
    pub failure_reason: Option<String>,

    /// Per-update scene export
    pub export: SceneExport,
}

/// Runs scenarios against a headless engine.
pub struct ScenarioRunner {
    seed: u64,
    config: EngineConfig,
    viewport: Viewport,

    /// Render ticks allowed between steps
    frames_per_step: u32,
}

impl ScenarioRunner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: EngineConfig::default(),
            viewport: Viewport::new(800, 600),
            frames_per_step: 4,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_frames(mut self, frames_per_step: u32) -> Self {
        self.frames_per_step = frames_per_step;
        self
    }

    /// Runs a scenario to completion on a fresh single-threaded runtime.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, ScenarioError> {
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        runtime.block_on(self.run_async(scenario))
    }

    /// Runs a scenario on the caller's runtime.
    pub async fn run_async(&self, scenario: ScenarioId) -> Result<ScenarioResult, ScenarioError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let context = SimContext::new(self.seed);
        let steps = context.with_rng(|rng| scenario.steps(rng));

        let host = HeadlessHost::shared_with(SURFACE, self.viewport);
        let mut engine = VisualizationEngine::new(
            host.clone(),
            &SurfaceId::new(SURFACE),
            self.config.clone(),
            Box::new(RecordingRenderer::new()),
        )?;
        let joint_count = engine.frames().len();

        let (tx, rx) = mpsc::channel(32);
        let driver = Driver {
            commands: tx,
            context: &context,
            host: &*host,
            frame_interval: self.config.render.frame_interval(),
            frames_per_step: self.frames_per_step,
            joint_count,
            export: SceneExport::new(scenario.name(), self.seed),
            failures: Vec::new(),
        };

        let (dispatch, driven) = tokio::join!(run_engine(&mut engine, rx, &context), driver.run(&steps));
        let (mut export, mut failures) = driven?;

        if let Some(reference) = scenario.reference_frame6() {
            check_reference(&engine, reference, &mut failures);
        }

        let expected_applied = steps.iter().filter(|s| matches!(s, Step::Pose(_))).count() as u64;
        let expected_rejected = steps.iter().filter(|s| matches!(s, Step::Malformed(_))).count() as u64;
        if dispatch.poses_applied != expected_applied || dispatch.poses_rejected != expected_rejected {
            failures.push(format!(
                "dispatcher applied {}/{} and rejected {}/{} poses",
                dispatch.poses_applied, expected_applied, dispatch.poses_rejected, expected_rejected
            ));
        }
        if self.frames_per_step > 0 && dispatch.frames_rendered == 0 {
            failures.push("no frames rendered".to_string());
        }

        let final_time_secs = context.now().as_secs_f64();
        let passed = failures.is_empty();
        let failure_reason = failures.into_iter().next();
        export.finalize(passed, failure_reason.clone(), final_time_secs);

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            steps: steps.len(),
            dispatch,
            final_time_secs,
            failure_reason,
            export,
        })
    }
}

/// The client side of a run: sends each step and checks the scene after it.
struct Driver<'a> {
    commands: mpsc::Sender<EngineCommand>,
    context: &'a SimContext,
    host: &'a HeadlessHost,
    frame_interval: std::time::Duration,
    frames_per_step: u32,
    joint_count: usize,
    export: SceneExport,
    failures: Vec<String>,
}

impl Driver<'_> {
    async fn run(mut self, steps: &[Step]) -> Result<(SceneExport, Vec<String>), ScenarioError> {
        for (index, step) in steps.iter().enumerate() {
            debug!(step = index, ?step, "Driving step");
            match step {
                Step::Pose(pose) => {
                    let result = self.update_pose(pose).await?;
                    let snapshot = self.snapshot().await?;
                    if let Err(e) = result {
                        self.fail(format!("step {}: valid pose rejected: {}", index, e));
                    }
                    self.check_scene(index, &snapshot);
                    self.export.add_frame(ExportFrame::from_snapshot(
                        &snapshot,
                        pose,
                        self.context.now().as_secs_f64(),
                    ));
                }
                Step::Malformed(pose) => {
                    let before = self.snapshot().await?;
                    let result = self.update_pose(pose).await?;
                    let after = self.snapshot().await?;
                    if !matches!(result, Err(EngineError::InvalidInput(_))) {
                        self.fail(format!("step {}: malformed pose was not rejected", index));
                    }
                    if !same_geometry(&before, &after) {
                        self.fail(format!("step {}: rejected pose changed the scene", index));
                    }
                }
                Step::Resize(viewport) => {
                    if let Err(e) = self.host.set_viewport(&SurfaceId::new(SURFACE), *viewport) {
                        self.fail(format!("step {}: {}", index, e));
                        continue;
                    }
                    let (command, reply) = EngineCommand::resize();
                    self.send(command).await?;
                    match reply.await.map_err(|_| ScenarioError::DispatcherClosed)? {
                        Ok(applied) => {
                            let snapshot = self.snapshot().await?;
                            if snapshot.aspect != applied.aspect() || !snapshot.aspect.is_finite() {
                                self.fail(format!("step {}: aspect {} after resize", index, snapshot.aspect));
                            }
                        }
                        Err(e) => self.fail(format!("step {}: resize failed: {}", index, e)),
                    }
                }
                Step::Orbit { azimuth, polar } => {
                    self.send(EngineCommand::Orbit {
                        azimuth: *azimuth,
                        polar: *polar,
                    })
                    .await?;
                }
            }

            for _ in 0..self.frames_per_step {
                self.context.sleep(self.frame_interval).await;
            }
        }

        self.send(EngineCommand::Stop).await?;
        Ok((self.export, self.failures))
    }

    async fn send(&self, command: EngineCommand) -> Result<(), ScenarioError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ScenarioError::DispatcherClosed)
    }

    async fn update_pose(&self, pose: &[f64]) -> Result<Result<(), EngineError>, ScenarioError> {
        let (command, reply) = EngineCommand::update_pose(pose.to_vec());
        self.send(command).await?;
        reply.await.map_err(|_| ScenarioError::DispatcherClosed)
    }

    async fn snapshot(&self) -> Result<SceneSnapshot, ScenarioError> {
        let (command, reply) = EngineCommand::snapshot();
        self.send(command).await?;
        reply.await.map_err(|_| ScenarioError::DispatcherClosed)
    }

    fn check_scene(&mut self, index: usize, snapshot: &SceneSnapshot) {
        if snapshot.composition_residual > COMPOSITION_TOLERANCE {
            self.fail(format!(
                "step {}: composition residual {:e}",
                index, snapshot.composition_residual
            ));
        }

        // Base + N frames + anchor gives N + 1 pairs
        if snapshot.segments.len() + snapshot.skipped_links != self.joint_count + 1 {
            self.fail(format!(
                "step {}: {} segments + {} skipped != {}",
                index,
                snapshot.segments.len(),
                snapshot.skipped_links,
                self.joint_count + 1
            ));
        }

        if snapshot.segments.iter().filter(|s| s.kind == LinkKind::Tool).count() > 1 {
            self.fail(format!("step {}: more than one tool segment", index));
        }

        let finite = snapshot.segments.iter().all(|s| {
            s.start.iter().chain(s.end.iter()).all(|v| v.is_finite())
                && s.rotation.quaternion().coords.iter().all(|c| c.is_finite())
        });
        if !finite {
            self.fail(format!("step {}: non-finite segment", index));
        }
    }

    fn fail(&mut self, reason: String) {
        warn!("{}", reason);
        self.failures.push(reason);
    }
}

fn same_geometry(a: &SceneSnapshot, b: &SceneSnapshot) -> bool {
    a.update == b.update && a.frame_origins == b.frame_origins && a.anchor == b.anchor && a.segments == b.segments
}

fn check_reference(engine: &VisualizationEngine, reference: [f64; 3], failures: &mut Vec<String>) {
    let Some(last) = engine.frames().nodes().last() else {
        failures.push("engine has no frames".to_string());
        return;
    };
    let origin = last.world_origin();
    let error = (origin.coords - nalgebra::Vector3::from(reference)).norm();
    if error > REFERENCE_TOLERANCE {
        let reason = format!(
            "frame 6 at ({:.5}, {:.5}, {:.5}), expected ({:.5}, {:.5}, {:.5})",
            origin.x, origin.y, origin.z, reference[0], reference[1], reference[2]
        );
        warn!("{}", reason);
        failures.push(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinoview_core::dh::WristBias;

    #[test]
    fn test_every_scenario_passes() {
        for scenario in ScenarioId::all() {
            let result = ScenarioRunner::new(42).run(scenario).unwrap();
            assert!(
                result.passed,
                "{} failed: {:?}",
                scenario.name(),
                result.failure_reason
            );
            assert!(result.dispatch.frames_rendered > 0);
        }
    }

    #[test]
    fn test_export_has_one_frame_per_pose() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Home).unwrap();
        assert_eq!(result.export.frames.len(), 2);
        assert_eq!(result.export.frames[1].frame_origins.len(), 6);
        assert_eq!(result.export.frames[1].segments.len(), 7);
        assert!(result.export.passed);
    }

    #[test]
    fn test_random_is_reproducible() {
        let a = ScenarioRunner::new(99).run(ScenarioId::Random).unwrap();
        let b = ScenarioRunner::new(99).run(ScenarioId::Random).unwrap();
        let poses_a: Vec<_> = a.export.frames.iter().map(|f| f.pose.clone()).collect();
        let poses_b: Vec<_> = b.export.frames.iter().map(|f| f.pose.clone()).collect();
        assert_eq!(poses_a, poses_b);
        assert_eq!(a.export.frames.len(), 20);
    }

    #[test]
    fn test_wrist_flip_counts_rejections() {
        let result = ScenarioRunner::new(1).run(ScenarioId::WristFlip).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.dispatch.poses_rejected, 3);
        assert_eq!(result.dispatch.poses_applied, 5);
    }

    #[test]
    fn test_wrist_bias_keeps_reference_positions() {
        let mut config = EngineConfig::default();
        config.robot.wrist_bias = WristBias::HalfTurn;
        let result = ScenarioRunner::new(3).with_config(config).run(ScenarioId::Home).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_without_render_frames() {
        let result = ScenarioRunner::new(5).with_frames(0).run(ScenarioId::Zero).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
    }
}
