//! Synapse Simulator CLI
//!
//! Run deterministic control-surface scenarios against the transmission
//! controller, or play one run against the wall clock.

use clap::Parser;
use std::time::{SystemTime, UNIX_EPOCH};
use synapse_core::{SimulationController, SynapseConfig};
use synapse_env::{RealtimeContext, SynapseContext};
use synapse_sim::scenarios::ScenarioId;
use synapse_sim::{
    drive, ScenarioResult, ScenarioRunner, SimError, TransmissionOracle, CONTROLLER_STREAM,
};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Synapse Deterministic Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "synapse-sim")]
#[command(about = "Run deterministic synaptic transmission scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (full_run, threshold_timing, pause_resume, reset_mid_cycle,
    /// rapid_toggle, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Maximum simulation duration in seconds
    #[arg(short, long, default_value = "60")]
    duration: f64,

    /// Display frame rate override
    #[arg(long)]
    fps: Option<u32>,

    /// Loop limit override
    #[arg(long)]
    max_loops: Option<u32>,

    /// JSON parameter file (missing fields keep their defaults)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frame snapshots of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Snapshot every N frames when exporting
    #[arg(long, default_value = "10")]
    export_interval: u64,

    /// Play one full run against the wall clock instead of the scenarios
    #[arg(long)]
    realtime: bool,
}

fn load_config(args: &Args) -> Result<SynapseConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => SynapseConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SynapseConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(max_loops) = args.max_loops {
        config.max_loops = max_loops;
    }
    config.validate()?;
    Ok(config)
}

/// Plays one run paced by the wall clock.
fn run_realtime(config: SynapseConfig, duration: f64) -> Result<bool, SimError> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let ctx = RealtimeContext::new(config.fps)?;
        let max_frames = (duration.max(0.0) * f64::from(config.fps)) as u64;
        let mut sim = SimulationController::new(config, ctx.derive_rng(CONTROLLER_STREAM))?;
        let mut oracle = TransmissionOracle::new();

        sim.start();
        let frames = drive(&ctx, &mut sim, &mut oracle, max_frames).await;
        let report = oracle.audit(&sim);

        info!(
            "Played {} frames in {:.1}s: {} cycles, {} transitions",
            frames,
            ctx.now().as_secs_f64(),
            report.completed_cycles,
            report.transitions
        );
        for violation in &report.violations {
            error!("  - {}", violation);
        }
        Ok::<_, SimError>(report.is_clean() && !sim.is_playing())
    })
}

fn report(result: &ScenarioResult, json: bool) {
    if json {
        return;
    }
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED in {} frames",
            result.scenario.name(),
            result.seed,
            result.total_frames
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging (RUST_LOG wins over --verbose when set)
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder().with_max_level(level);
    let installed = match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
        }
        Err(_) => tracing::subscriber::set_global_default(builder.finish()),
    };
    installed.expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Synapse Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if args.realtime {
        match run_realtime(config, args.duration) {
            Ok(true) => info!("✓ Realtime run completed"),
            Ok(false) => {
                error!("✗ Realtime run did not complete cleanly");
                std::process::exit(1);
            }
            Err(e) => {
                error!("✗ Realtime run failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(1);
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let runner = ScenarioRunner::new(base_seed)
            .with_config(config)
            .with_duration(args.duration);
        let (result, export) = runner.run_recorded(scenarios[0], args.export_interval);
        report(&result, args.json);

        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path),
            Err(e) => {
                error!("Failed to write export: {}", e);
                std::process::exit(1);
            }
        }

        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed)
            .with_config(config.clone())
            .with_duration(args.duration);

        for scenario in &scenarios {
            let result = runner.run(*scenario);
            report(&result, args.json);
            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.total_frames,
                    "time_secs": r.final_time_secs,
                    "cycles_completed": r.cycles_completed,
                    "vesicles_released": r.metrics.vesicles_released,
                    "transmitters_spawned": r.metrics.transmitters_spawned,
                    "receptors_bound": r.metrics.receptors_bound,
                    "stale_timers_discarded": r.metrics.stale_timers_discarded,
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
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
