//! Scenario runner - executes control-surface scenarios on a virtual clock.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::SimExport;
use crate::oracle::TransmissionOracle;
use crate::scenarios::ScenarioId;

use synapse_core::{SimulationController, Snapshot, Stage, SynapseConfig};
use synapse_env::SynapseContext;
use tracing::{debug, info, warn};

/// RNG stream feeding the controller (placement and release sampling).
pub const CONTROLLER_STREAM: u64 = 1;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total frames executed
    pub total_frames: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Cycles that ran to completion
    pub cycles_completed: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    pub vesicles_released: u64,
    pub transmitters_spawned: u64,
    pub receptors_bound: u64,

    /// Timers dropped after pause, reset or halt
    pub stale_timers_discarded: u64,

    /// Stage entries the stage machine refused
    pub rejected_transitions: u64,
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Simulation parameters (its seed is overridden by `seed`)
    config: SynapseConfig,

    /// Maximum duration in seconds
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with default parameters.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: SynapseConfig::default(),
            max_duration_secs: 60.0,
        }
    }

    /// Sets the simulation parameters.
    pub fn with_config(mut self, config: SynapseConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None).0
    }

    /// Runs a scenario, recording a snapshot every `interval` frames.
    pub fn run_recorded(&self, scenario: ScenarioId, interval: u64) -> (ScenarioResult, SimExport) {
        let recorder = Recorder {
            interval: interval.max(1),
            export: SimExport::new(scenario.name(), self.seed),
        };
        let (result, export) = self.execute(scenario, Some(recorder));
        let export = export.unwrap_or_else(|| SimExport::new(scenario.name(), self.seed));
        (result, export)
    }

    fn execute(
        &self,
        scenario: ScenarioId,
        recorder: Option<Recorder>,
    ) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let config = SynapseConfig {
            seed: self.seed,
            ..self.config.clone()
        };
        let mut harness = match Harness::new(config, self.max_duration_secs, recorder) {
            Ok(h) => h,
            Err(e) => return (setup_failure(scenario, self.seed, &e), None),
        };

        let outcome = match scenario {
            ScenarioId::FullRun => run_full(&mut harness),
            ScenarioId::ThresholdTiming => run_threshold_timing(&mut harness),
            ScenarioId::PauseResume => run_pause_resume(&mut harness),
            ScenarioId::ResetMidCycle => run_reset_mid_cycle(&mut harness),
            ScenarioId::RapidToggle => run_rapid_toggle(&mut harness),
        };

        harness.finish(scenario, self.seed, outcome.err())
    }
}

/// First frame at which a pulse from `start` moving `speed` per frame
/// reaches `threshold`, using the same accumulation as the tracker.
pub fn crossing_frame(start: f64, speed: f64, threshold: f64) -> u64 {
    let mut position = start;
    let mut frame = 0;
    while position < threshold && speed > 0.0 {
        position += speed;
        frame += 1;
    }
    frame
}

/// Drives a started controller frame by frame from any context until it
/// stops playing or `max_frames` elapse. Returns the frames executed.
pub async fn drive<C: SynapseContext>(
    ctx: &C,
    sim: &mut SimulationController,
    oracle: &mut TransmissionOracle,
    max_frames: u64,
) -> u64 {
    let mut frames = 0;
    while frames < max_frames && sim.is_playing() {
        ctx.next_frame().await;
        sim.frame(ctx.now());
        oracle.observe(sim);
        frames += 1;

        if frames % 60 == 0 {
            debug!(
                "  t={:.1}s | stage={} | loop={} | transmitters={}",
                ctx.now().as_secs_f64(),
                sim.stage(),
                sim.loop_count(),
                sim.transmitters().len()
            );
        }
    }
    frames
}

/// Periodic snapshot recording.
struct Recorder {
    interval: u64,
    export: SimExport,
}

/// A controller on a virtual clock, audited every frame.
struct Harness {
    context: SimContext,
    sim: SimulationController,
    oracle: TransmissionOracle,
    frames: u64,
    max_frames: u64,
    recorder: Option<Recorder>,
}

impl Harness {
    fn new(
        config: SynapseConfig,
        max_duration_secs: f64,
        recorder: Option<Recorder>,
    ) -> Result<Self, SimError> {
        let context = SimContext::new(config.seed, config.fps)?;
        let max_frames = (max_duration_secs.max(0.0) * f64::from(config.fps)) as u64;
        let sim = SimulationController::new(config, context.derive_rng(CONTROLLER_STREAM))?;

        Ok(Self {
            context,
            sim,
            oracle: TransmissionOracle::new(),
            frames: 0,
            max_frames,
            recorder,
        })
    }

    fn fps(&self) -> u64 {
        u64::from(self.sim.config().fps)
    }

    /// Advances one frame. Returns false once the frame budget is spent.
    fn tick(&mut self) -> bool {
        if self.frames >= self.max_frames {
            return false;
        }
        self.context.advance_frame();
        self.sim.frame(self.context.now());
        self.oracle.observe(&self.sim);
        self.frames += 1;

        if let Some(recorder) = self.recorder.as_mut() {
            if self.frames % recorder.interval == 0 {
                recorder.export.add_frame(Snapshot::capture(&self.sim));
            }
        }
        true
    }

    /// Ticks until `pred` holds. False if the budget ran out first.
    fn run_until(&mut self, mut pred: impl FnMut(&SimulationController) -> bool) -> bool {
        while self.tick() {
            if pred(&self.sim) {
                return true;
            }
        }
        false
    }

    fn run_frames(&mut self, n: u64) {
        for _ in 0..n {
            if !self.tick() {
                return;
            }
        }
    }

    /// Explains why a run did not reach the loop limit.
    fn describe_stall(&self) -> String {
        let stage = self.sim.stage();
        if stage == Stage::VesicleRelease && self.sim.transmitters().is_empty() {
            return "stalled in vesicle_release: no vesicle released".to_string();
        }
        format!(
            "did not halt within {} frames (stage {}, loop {})",
            self.max_frames,
            stage,
            self.sim.loop_count()
        )
    }

    fn finish(
        mut self,
        scenario: ScenarioId,
        seed: u64,
        failure: Option<String>,
    ) -> (ScenarioResult, Option<SimExport>) {
        let report = self.oracle.audit(&self.sim);
        let failure = failure.or_else(|| {
            (!report.is_clean()).then(|| report.violations.join("; "))
        });
        let passed = failure.is_none();

        if let Some(reason) = &failure {
            warn!("{} failed: {}", scenario.name(), reason);
        }

        let stats = self.sim.stats();
        let result = ScenarioResult {
            scenario,
            seed,
            passed,
            total_frames: self.frames,
            final_time_secs: self.context.now().as_secs_f64(),
            cycles_completed: stats.cycles_completed,
            failure_reason: failure.clone(),
            metrics: ScenarioMetrics {
                vesicles_released: stats.vesicles_released,
                transmitters_spawned: stats.transmitters_spawned,
                receptors_bound: stats.receptors_bound,
                stale_timers_discarded: self.sim.stale_timers_discarded(),
                rejected_transitions: stats.rejected_transitions,
            },
        };

        let export = self.recorder.take().map(|mut recorder| {
            recorder
                .export
                .finalize(passed, failure, self.sim.history());
            recorder.export
        });

        (result, export)
    }
}

fn setup_failure(scenario: ScenarioId, seed: u64, error: &SimError) -> ScenarioResult {
    ScenarioResult {
        scenario,
        seed,
        passed: false,
        total_frames: 0,
        final_time_secs: 0.0,
        cycles_completed: 0,
        failure_reason: Some(format!("setup failed: {}", error)),
        metrics: ScenarioMetrics::default(),
    }
}

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason())
    }
}

/// SYN-001: FullRun - start once, every cycle runs, then playback halts.
fn run_full(h: &mut Harness) -> Result<(), String> {
    h.sim.start();
    if !h.run_until(|s| !s.is_playing()) {
        return Err(h.describe_stall());
    }

    let expected = u64::from(h.sim.config().max_loops);
    let completed = h.sim.stats().cycles_completed;
    ensure(completed == expected, || {
        format!("{} cycles completed, expected {}", completed, expected)
    })?;
    ensure(h.sim.stage() == Stage::Idle && h.sim.loop_count() == 0, || {
        format!("halted at {} with loop {}", h.sim.stage(), h.sim.loop_count())
    })?;

    // No automatic restart after the halt
    let started = h.sim.stats().cycles_started;
    h.run_frames(h.fps() * 3);
    ensure(!h.sim.is_playing() && h.sim.stats().cycles_started == started, || {
        "playback restarted after halt".to_string()
    })
}

/// SYN-002: ThresholdTiming - calcium and release fire on the crossing frames.
fn run_threshold_timing(h: &mut Harness) -> Result<(), String> {
    let config = h.sim.config().clone();
    let calcium_crossing =
        crossing_frame(config.pulse_start, config.pulse_speed, config.calcium_threshold);
    let release_crossing =
        crossing_frame(config.pulse_start, config.pulse_speed, config.release_threshold);

    h.sim.start();
    let start_frame = h.frames;

    if !h.run_until(|s| s.guards().calcium_triggered) {
        return Err("calcium threshold never fired".to_string());
    }
    let calcium_frame = h.frames - start_frame;
    ensure(calcium_frame == calcium_crossing, || {
        format!("calcium fired at frame {}, expected {}", calcium_frame, calcium_crossing)
    })?;

    // Release also needs CalciumOpen, entered after the calcium delay
    let interval_ns = h.context.frame_interval().as_nanos().max(1);
    let calcium_due_ns = u128::from(h.context.time_ns())
        + u128::from(config.delays.calcium_to_stage_ms) * 1_000_000;
    let stage_frames = u64::try_from(calcium_due_ns.div_ceil(interval_ns)).unwrap_or(u64::MAX);
    let expected_release = release_crossing.max(stage_frames.saturating_sub(start_frame));

    if !h.run_until(|s| s.guards().release_triggered) {
        return Err("release threshold never fired".to_string());
    }
    let release_frame = h.frames - start_frame;
    ensure(release_frame == expected_release, || {
        format!("release fired at frame {}, expected {}", release_frame, expected_release)
    })?;

    info!(
        "  calcium at frame {}, release at frame {}",
        calcium_frame, release_frame
    );
    Ok(())
}

/// SYN-003: PauseResume - a pending transition must not fire after pause.
fn run_pause_resume(h: &mut Harness) -> Result<(), String> {
    h.sim.start();
    if !h.run_until(|s| s.guards().calcium_triggered) {
        return Err("calcium threshold never fired".to_string());
    }
    ensure(h.sim.pending_timers() > 0, || "no transition pending".to_string())?;

    let paused_stage = h.sim.stage();
    h.sim.pause();
    h.run_frames(h.fps());

    ensure(h.sim.stage() == paused_stage, || {
        format!("stage moved from {} to {} while paused", paused_stage, h.sim.stage())
    })?;
    ensure(h.sim.stale_timers_discarded() > 0, || {
        "pending timer was not discarded".to_string()
    })?;

    h.sim.start();
    let pulse_start = h.sim.config().pulse_start;
    let fresh = h.sim.stage() == Stage::Depolarizing
        && h.sim.loop_count() == 0
        && h.sim.action_potentials().len() == 1
        && h.sim.action_potentials().iter().all(|p| p.position == pulse_start);
    ensure(fresh, || "resume did not launch a fresh cycle".to_string())?;

    if !h.run_until(|s| !s.is_playing()) {
        return Err(h.describe_stall());
    }
    let expected = u64::from(h.sim.config().max_loops);
    let completed = h.sim.stats().cycles_completed;
    ensure(completed == expected, || {
        format!("{} cycles completed after resume, expected {}", completed, expected)
    })
}

/// SYN-004: ResetMidCycle - reset restores the initial state and stays idle.
fn run_reset_mid_cycle(h: &mut Harness) -> Result<(), String> {
    h.sim.start();
    if !h.run_until(|s| s.stage() == Stage::VesicleRelease) {
        return Err(h.describe_stall());
    }

    h.sim.reset();
    let initial = h.sim.stage() == Stage::Idle
        && h.sim.loop_count() == 0
        && !h.sim.is_playing()
        && h.sim.is_pristine()
        && h.sim.effects().is_empty()
        && h.sim.history().is_empty()
        && h.sim.pending_timers() == 0;
    ensure(initial, || "reset left state behind".to_string())?;

    h.run_frames(h.fps() * 5);
    ensure(h.sim.stage() == Stage::Idle && h.sim.history().is_empty(), || {
        format!("stale timer moved stage to {}", h.sim.stage())
    })
}

/// SYN-005: RapidToggle - repeated start/pause never corrupts ordering.
fn run_rapid_toggle(h: &mut Harness) -> Result<(), String> {
    for _ in 0..40 {
        h.sim.start();
        h.run_frames(7);
    }
    if h.sim.is_playing() {
        h.sim.pause();
    }

    h.sim.start();
    if !h.run_until(|s| !s.is_playing()) {
        return Err(h.describe_stall());
    }
    ensure(h.sim.stats().halts == 1, || {
        format!("expected one halt, saw {}", h.sim.stats().halts)
    })
}
