//! Kinoview Rerun Demo
//!
//! Sweeps the Gen3 Lite from the zero pose to the home pose and back while
//! the camera slowly orbits, streaming every frame to Rerun.
//!
//! Run:
//! ```bash
//! cargo run -p kinoview_core --example rerun_arm --features visualization
//! cargo run -p kinoview_core --example rerun_arm --features visualization -- --save arm.rrd
//! ```

use kinoview_core::units::pose_from_degrees;
use kinoview_core::visualization::RerunRenderer;
use kinoview_core::{EngineConfig, VisualizationEngine};
use kinoview_env::{HeadlessHost, SurfaceId, Viewport};

const SURFACE: &str = "robot-visualization-container";
const FRAMES_PER_LEG: usize = 120;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🤖 Kinoview Rerun Demo");

    let args: Vec<String> = std::env::args().collect();
    let renderer = match args.iter().position(|a| a == "--save") {
        Some(i) => {
            let path = args.get(i + 1).map(String::as_str).unwrap_or("kinoview_arm.rrd");
            println!("Saving to {}", path);
            RerunRenderer::save("Kinoview Arm", path)?
        }
        None => RerunRenderer::spawn("Kinoview Arm")?,
    };

    let host = HeadlessHost::shared_with(SURFACE, Viewport::new(1280, 720));
    let mut engine = VisualizationEngine::new(
        host,
        &SurfaceId::new(SURFACE),
        EngineConfig::default(),
        Box::new(renderer),
    )?;
    engine.start();

    let zero = [0.0; 6];
    let home = pose_from_degrees(&[0.0, 344.0, 75.0, 0.0, 300.0, 0.0]);

    for leg in 0..2 {
        let (from, to) = if leg == 0 { (&zero[..], &home[..]) } else { (&home[..], &zero[..]) };
        for step in 0..=FRAMES_PER_LEG {
            let t = step as f64 / FRAMES_PER_LEG as f64;
            let pose: Vec<f64> = from.iter().zip(to).map(|(a, b)| a + (b - a) * t).collect();
            engine.update_pose(&pose)?;
            engine.camera_mut().orbit(0.01, 0.0);
            engine.tick();
        }
    }

    engine.stop();
    println!("✅ Done ({} frames)", engine.render_loop().frames_rendered());
    Ok(())
}
