//! Single-task driver for a `VisualizationEngine`.
//!
//! Commands and render ticks are multiplexed with `tokio::select!` on one
//! task, so a pose update always runs to completion before the next tick
//! sees the scene, and updates are applied strictly in arrival order.
//!
//! ```ignore
//! let (tx, rx) = mpsc::channel(64);
//! let driver = run_engine(&mut engine, rx, clock.as_ref());
//!
//! let (cmd, reply) = EngineCommand::update_pose(angles);
//! tx.send(cmd).await?;
//! reply.await??;
//! ```

use crate::config::Theme;
use crate::engine::{SceneSnapshot, VisualizationEngine};
use crate::error::EngineError;
use crate::render_loop::TickOutcome;
use kinoview_env::{FrameClock, Viewport};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type Reply<T> = Option<oneshot::Sender<T>>;

/// Messages accepted by `run_engine`.
#[derive(Debug)]
pub enum EngineCommand {
    /// Apply a joint-angle vector (radians)
    UpdatePose {
        angles: Vec<f64>,
        reply: Reply<Result<(), EngineError>>,
    },
    /// Re-read the surface size
    Resize { reply: Reply<Result<Viewport, EngineError>> },
    SetTheme(Theme),
    /// Queue an orbit of the camera (radians)
    Orbit { azimuth: f64, polar: f64 },
    /// Scale the camera distance
    Zoom(f64),
    /// Copy out the current scene
    Snapshot { reply: oneshot::Sender<SceneSnapshot> },
    Stop,
}

impl EngineCommand {
    /// Pose update paired with the receiver of its result.
    pub fn update_pose(angles: Vec<f64>) -> (Self, oneshot::Receiver<Result<(), EngineError>>) {
        let (tx, rx) = oneshot::channel();
        (Self::UpdatePose { angles, reply: Some(tx) }, rx)
    }

    /// Resize paired with the receiver of the new viewport.
    pub fn resize() -> (Self, oneshot::Receiver<Result<Viewport, EngineError>>) {
        let (tx, rx) = oneshot::channel();
        (Self::Resize { reply: Some(tx) }, rx)
    }

    pub fn snapshot() -> (Self, oneshot::Receiver<SceneSnapshot>) {
        let (tx, rx) = oneshot::channel();
        (Self::Snapshot { reply: tx }, rx)
    }
}

/// Why the dispatcher returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Requested,
    ChannelClosed,
}

/// What happened during one `run_engine` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub commands: u64,
    pub poses_applied: u64,
    pub poses_rejected: u64,
    pub resizes: u64,
    pub ticks: u64,
    pub frames_rendered: u64,
    pub render_failures: u64,
    /// Clock time spent inside the loop
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

/// Runs the engine until `Stop` arrives or every sender is dropped.
///
/// The render loop is started on entry and stopped on exit. Ticks follow a
/// fixed deadline one frame interval apart, independent of how often
/// commands arrive. Commands take priority over ticks when both are ready. A dropped reply receiver is not
/// an error; the command is still applied.
pub async fn run_engine<C>(
    engine: &mut VisualizationEngine,
    mut commands: mpsc::Receiver<EngineCommand>,
    clock: &C,
) -> DispatchSummary
where
    C: FrameClock + ?Sized,
{
    let interval = engine.config().render.frame_interval();
    let started_at = clock.now();
    let mut summary = DispatchSummary {
        commands: 0,
        poses_applied: 0,
        poses_rejected: 0,
        resizes: 0,
        ticks: 0,
        frames_rendered: 0,
        render_failures: 0,
        elapsed: Duration::ZERO,
        stop_reason: StopReason::ChannelClosed,
    };

    engine.start();
    info!(interval_ms = interval.as_secs_f64() * 1000.0, "Dispatcher running");

    // Fixed tick deadline; commands never push it back
    let mut next_tick = started_at + interval;

    loop {
        let wait = next_tick.saturating_sub(clock.now());

        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else {
                    summary.stop_reason = StopReason::ChannelClosed;
                    break;
                };
                summary.commands += 1;
                if !apply(engine, command, &mut summary) {
                    summary.stop_reason = StopReason::Requested;
                    break;
                }
            }

            _ = clock.sleep(wait) => {
                let now = clock.now();
                next_tick += interval;
                if next_tick <= now {
                    next_tick = now + interval;
                }

                summary.ticks += 1;
                match engine.tick() {
                    TickOutcome::Rendered => summary.frames_rendered += 1,
                    TickOutcome::Failed => summary.render_failures += 1,
                    TickOutcome::Idle => {}
                }
            }
        }
    }

    engine.stop();
    summary.elapsed = clock.now().saturating_sub(started_at);
    info!(
        commands = summary.commands,
        poses = summary.poses_applied,
        ticks = summary.ticks,
        reason = ?summary.stop_reason,
        "Dispatcher stopped"
    );
    summary
}

/// Applies one command. Returns false on `Stop`.
fn apply(engine: &mut VisualizationEngine, command: EngineCommand, summary: &mut DispatchSummary) -> bool {
    match command {
        EngineCommand::UpdatePose { angles, reply } => {
            let result = engine.update_pose(&angles);
            match result {
                Ok(()) => summary.poses_applied += 1,
                Err(_) => summary.poses_rejected += 1,
            }
            send_reply(reply, result);
        }
        EngineCommand::Resize { reply } => {
            let result = engine.resize();
            if result.is_ok() {
                summary.resizes += 1;
            }
            send_reply(reply, result);
        }
        EngineCommand::SetTheme(theme) => engine.set_theme(theme),
        EngineCommand::Orbit { azimuth, polar } => engine.camera_mut().orbit(azimuth, polar),
        EngineCommand::Zoom(factor) => engine.camera_mut().zoom(factor),
        EngineCommand::Snapshot { reply } => {
            if reply.send(engine.snapshot()).is_err() {
                debug!("Snapshot receiver dropped");
            }
        }
        EngineCommand::Stop => return false,
    }
    true
}

fn send_reply<T>(reply: Reply<T>, value: T) {
    if let Some(tx) = reply {
        if tx.send(value).is_err() {
            debug!("Reply receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::render::RecordingRenderer;
    use async_trait::async_trait;
    use kinoview_env::{HeadlessHost, SurfaceId};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Clock that advances instantly and yields so the sender side can run.
    #[derive(Default)]
    struct StepClock {
        nanos: AtomicU64,
    }

    #[async_trait]
    impl FrameClock for StepClock {
        fn now(&self) -> Duration {
            Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
        }

        async fn sleep(&self, duration: Duration) {
            self.nanos.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }
    }

    fn engine() -> (VisualizationEngine, Arc<HeadlessHost>) {
        let host = HeadlessHost::shared_with("canvas", Viewport::new(800, 600));
        let engine = VisualizationEngine::new(
            host.clone(),
            &SurfaceId::new("canvas"),
            EngineConfig::default(),
            Box::new(RecordingRenderer::new()),
        )
        .unwrap();
        (engine, host)
    }

    #[tokio::test]
    async fn test_updates_applied_in_order_last_wins() {
        let (mut engine, _host) = engine();
        let clock = StepClock::default();
        let (tx, rx) = mpsc::channel(16);

        for angle in [0.1, 0.2, 0.3] {
            tx.send(EngineCommand::UpdatePose {
                angles: vec![angle; 6],
                reply: None,
            })
            .await
            .unwrap();
        }
        drop(tx);

        let summary = run_engine(&mut engine, rx, &clock).await;
        assert_eq!(summary.poses_applied, 3);
        assert_eq!(summary.stop_reason, StopReason::ChannelClosed);
        assert!(!engine.is_running());

        let mut expected = engine.frames().clone();
        expected.update_pose(&[0.3; 6]).unwrap();
        assert_eq!(engine.frames().anchor_world(), expected.anchor_world());
    }

    #[tokio::test]
    async fn test_replies_and_stop() {
        let (mut engine, host) = engine();
        let clock = StepClock::default();
        let client_clock = &clock;
        let (tx, rx) = mpsc::channel(16);

        let client = async move {
            let (cmd, reply) = EngineCommand::update_pose(vec![0.0; 5]);
            tx.send(cmd).await.unwrap();
            assert!(matches!(reply.await.unwrap(), Err(EngineError::InvalidInput(_))));

            let (cmd, reply) = EngineCommand::update_pose(vec![0.5; 6]);
            tx.send(cmd).await.unwrap();
            reply.await.unwrap().unwrap();

            // Let a few frames render between commands
            for _ in 0..10 {
                client_clock.sleep(Duration::from_millis(1)).await;
            }

            host.set_viewport(&SurfaceId::new("canvas"), Viewport::new(1000, 250)).unwrap();
            let (cmd, reply) = EngineCommand::resize();
            tx.send(cmd).await.unwrap();
            assert_eq!(reply.await.unwrap().unwrap(), Viewport::new(1000, 250));

            let (cmd, reply) = EngineCommand::snapshot();
            tx.send(cmd).await.unwrap();
            let snapshot = reply.await.unwrap();

            tx.send(EngineCommand::Stop).await.unwrap();
            snapshot
        };

        let (summary, snapshot) = tokio::join!(run_engine(&mut engine, rx, &clock), client);

        assert_eq!(summary.stop_reason, StopReason::Requested);
        assert_eq!(summary.poses_applied, 1);
        assert_eq!(summary.poses_rejected, 1);
        assert_eq!(summary.resizes, 1);
        assert_eq!(summary.frames_rendered, summary.ticks);
        assert!(summary.ticks > 0);
        assert_eq!(snapshot.aspect, 4.0);
        assert_eq!(snapshot.update, 2);
    }

    #[tokio::test]
    async fn test_theme_and_camera_commands() {
        let (mut engine, _host) = engine();
        let clock = StepClock::default();
        let (tx, rx) = mpsc::channel(16);
        let distance = engine.camera().distance();

        tx.send(EngineCommand::SetTheme(Theme::Dark)).await.unwrap();
        tx.send(EngineCommand::Zoom(100.0)).await.unwrap();
        drop(tx);

        run_engine(&mut engine, rx, &clock).await;
        assert_eq!(engine.theme(), Theme::Dark);
        // Zoom is applied on the next camera update, which no tick reached
        assert_eq!(engine.camera().distance(), distance);
        engine.camera_mut().update();
        approx::assert_relative_eq!(engine.camera().distance(), 10.0, epsilon = 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_pose_stream_keeps_rendering() {
        let (mut engine, _host) = engine();
        let clock = kinoview_env::TokioClock::new();
        let client_clock = &clock;
        let (tx, rx) = mpsc::channel(16);

        // 50 poses 10 ms apart against a 60 Hz tick
        let client = async move {
            for i in 0..50 {
                let (cmd, reply) = EngineCommand::update_pose(vec![i as f64 * 0.01; 6]);
                tx.send(cmd).await.unwrap();
                reply.await.unwrap().unwrap();
                client_clock.sleep(Duration::from_millis(10)).await;
            }
            tx.send(EngineCommand::Stop).await.unwrap();
        };

        let (summary, ()) = tokio::join!(run_engine(&mut engine, rx, &clock), client);

        assert_eq!(summary.poses_applied, 50);
        assert_eq!(summary.frames_rendered, summary.ticks);
        // About 500 ms at 60 Hz
        assert!(summary.ticks >= 25 && summary.ticks <= 31, "ticks = {}", summary.ticks);
    }
}
