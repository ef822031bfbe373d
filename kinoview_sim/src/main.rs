//! Kinoview Scenario CLI
//!
//! Runs headless pose-stream scenarios against the visualization engine.

use clap::Parser;
use kinoview_core::EngineConfig;
use kinoview_env::Viewport;
use kinoview_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Kinoview headless scenario runner
#[derive(Parser, Debug)]
#[command(name = "kinoview-sim")]
#[command(about = "Run headless pose-stream scenarios against the Kinoview engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (zero, home, random, wrist_flip, sweep, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Render ticks between scenario steps
    #[arg(short, long, default_value = "4")]
    frames: u32,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Surface width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Surface height in pixels
    #[arg(long, default_value = "600")]
    height: u32,

    /// Device pixel ratio of the surface
    #[arg(long, default_value = "1.0")]
    pixel_ratio: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the scene of every pose update to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Kinoview scenario runner v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                error!("{}", e);
                error!("Available scenarios: zero, home, random, wrist_flip, sweep, all");
                std::process::exit(1);
            }
        }
    };

    let config = match &args.config {
        Some(path) => match EngineConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        error!("--export only supports a single scenario and seed");
        std::process::exit(1);
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_config(config.clone())
            .with_viewport(Viewport::new(args.width, args.height).with_pixel_ratio(args.pixel_ratio))
            .with_frames(args.frames);

        for scenario in &scenarios {
            if !args.json {
                info!("▶ {}: {}", scenario.name(), scenario.description());
            }

            let result = match runner.run(*scenario) {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} (seed={}) could not run: {}", scenario.name(), seed, e);
                    std::process::exit(1);
                }
            };

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED | {} poses, {} rejected, {} frames",
                        scenario.name(),
                        seed,
                        result.dispatch.poses_applied,
                        result.dispatch.poses_rejected,
                        result.dispatch.frames_rendered
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if let Some(path) = &args.export {
                match result.export.write_to_file(path) {
                    Ok(()) => info!("Exported {} frames to {}", result.export.frames.len(), path),
                    Err(e) => error!("Failed to write export: {}", e),
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "description": r.scenario.description(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "steps": r.steps,
                    "dispatch": r.dispatch,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
}
