//! The simulation controller.
//!
//! Owns every entity collection, the stage machine, the loop counter and
//! the transition timers. A render loop calls [`SimulationController::frame`]
//! once per display frame; the control surface (`start`, `pause`, `reset`,
//! `focus_synapse`, `toggle_labels`) can be called between frames.
//!
//! # Frame order
//!
//! 1. Fire timers due at or before `now` (stale generations are dropped)
//! 2. Advance action potentials, then evaluate the calcium and release
//!    thresholds against the post-advance position
//! 3. Tick neurotransmitters, then evaluate the binding threshold
//! 4. Expire finished visual effects
//!
//! Steps 2 and 3 only run while playing.

use crate::action_potential::ActionPotentialTracker;
use crate::config::SynapseConfig;
use crate::effects::{EffectKind, EffectLayer, VisualEffect};
use crate::entities::{
    ActionPotential, ChannelKind, EntityId, EntityStore, IonChannel, Neurotransmitter, Receptor,
    Vesicle,
};
use crate::error::ConfigError;
use crate::neurotransmitter::NeurotransmitterPool;
use crate::release::ReleaseSampler;
use crate::scheduler::{TransitionEvent, TransitionScheduler};
use crate::stage::{Stage, StageMachine, StageTransition};
use crate::view::{CameraTarget, ViewState};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Center of the postsynaptic depolarization visual.
const POSTSYNAPTIC_CENTER: [f64; 3] = [1.0, 0.0, 0.0];

/// One-shot guards for the level-triggered per-frame conditions.
///
/// Each is set the first frame its condition fires and cleared when a new
/// cycle starts, so a condition that stays true across a delay window
/// schedules its transition exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleGuards {
    pub calcium_triggered: bool,
    pub release_triggered: bool,
    pub bind_triggered: bool,
}

/// Counters accumulated over the controller's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub frames: u64,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub halts: u64,

    /// Stage entries refused by the stage machine; should stay zero
    pub rejected_transitions: u64,

    pub vesicles_released: u64,
    pub transmitters_spawned: u64,
    pub receptors_bound: u64,
}

/// Drives the synaptic transmission process.
pub struct SimulationController<R = ChaCha8Rng> {
    config: SynapseConfig,
    rng: R,
    stage: StageMachine,
    scheduler: TransitionScheduler,
    entities: EntityStore,
    pulses: ActionPotentialTracker,
    transmitters: NeurotransmitterPool,
    effects: EffectLayer,
    sampler: ReleaseSampler,
    view: ViewState,
    guards: CycleGuards,

    /// Pulse launched by the current cycle; the only one that triggers stages
    cycle_pulse: Option<EntityId>,

    is_playing: bool,
    loop_count: u32,

    /// Latest frame time seen
    now: Duration,

    stats: ControllerStats,
}

impl SimulationController<ChaCha8Rng> {
    /// Creates a controller whose random source is seeded from `config.seed`.
    pub fn from_seed(config: SynapseConfig) -> Result<Self, ConfigError> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::new(config, rng)
    }
}

impl<R: Rng> SimulationController<R> {
    /// Creates a controller and lays out the setup populations using `rng`.
    pub fn new(config: SynapseConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;

        let entities = EntityStore::populate(&config.populations, &mut rng);
        let sampler = ReleaseSampler::from_config(&config);
        let pulses = ActionPotentialTracker::new(config.travel_bound);

        info!(
            "Synapse ready: {} channels, {} vesicles, {} receptors",
            entities.channels.len(),
            entities.vesicles.len(),
            entities.receptors.len()
        );

        Ok(Self {
            config,
            rng,
            stage: StageMachine::new(),
            scheduler: TransitionScheduler::new(),
            entities,
            pulses,
            transmitters: NeurotransmitterPool::new(),
            effects: EffectLayer::new(),
            sampler,
            view: ViewState::default(),
            guards: CycleGuards::default(),
            cycle_pulse: None,
            is_playing: false,
            loop_count: 0,
            now: Duration::ZERO,
            stats: ControllerStats::default(),
        })
    }

    // ─────────────────────────────────────────────────────────────
    // Control surface
    // ─────────────────────────────────────────────────────────────

    /// Start/pause toggle.
    ///
    /// While playing this pauses. While paused or idle it clears the
    /// in-flight cycle, resets the loop counter and launches a fresh
    /// `Depolarizing` cycle with exactly one action potential.
    pub fn start(&mut self) {
        if self.is_playing {
            self.pause();
            return;
        }

        let now = self.now;
        self.scheduler.cancel_all();
        self.clear_cycle(now);
        self.loop_count = 0;
        self.is_playing = true;
        info!("▶ Playback started");
        self.begin_cycle(now);
    }

    /// Halts playback. Outstanding timers lose their effect.
    pub fn pause(&mut self) {
        if !self.is_playing {
            return;
        }
        self.is_playing = false;
        self.scheduler.cancel_all();
        info!("⏸ Playback paused at {}", self.stage.current());
    }

    /// Returns every collection to its initial state and halts playback.
    pub fn reset(&mut self) {
        self.is_playing = false;
        self.scheduler.cancel_all();
        self.clear_cycle(self.now);
        self.stage.clear();
        self.loop_count = 0;
        self.view.focus(CameraTarget::Overview);
        info!("⟲ Simulation reset");
    }

    /// Frames the camera on the synaptic cleft.
    pub fn focus_synapse(&mut self) {
        self.view.focus(CameraTarget::Synapse);
    }

    /// Shows or hides the structure labels. Returns the new visibility.
    pub fn toggle_labels(&mut self) -> bool {
        self.view.toggle_labels()
    }

    // ─────────────────────────────────────────────────────────────
    // Render clock
    // ─────────────────────────────────────────────────────────────

    /// Runs one display frame at clock time `now`.
    ///
    /// A `now` earlier than the previous frame is treated as the previous
    /// frame time.
    pub fn frame(&mut self, now: Duration) {
        let now = now.max(self.now);
        self.now = now;
        self.stats.frames += 1;

        while let Some(fired) = self.scheduler.pop_due(now) {
            self.apply(fired.event, fired.due);
        }

        if self.is_playing {
            self.advance_pulses(now);
            self.advance_transmitters(now);
        }

        self.effects.expire(now);
    }

    fn advance_pulses(&mut self, now: Duration) {
        self.pulses.advance();

        let flashes: Vec<f64> = self.pulses.within(self.config.electrical_window).collect();
        let flash_duration = Duration::from_millis(self.config.delays.electrical_visual_ms);
        for x in flashes {
            self.effects.spawn(EffectKind::Electrical { x }, now, flash_duration);
        }

        let Some(position) = self.cycle_pulse.and_then(|id| self.pulses.position(id)) else {
            return;
        };

        if position >= self.config.calcium_threshold
            && self.stage.current() == Stage::Depolarizing
            && !self.guards.calcium_triggered
        {
            self.guards.calcium_triggered = true;
            let opened = self.entities.open_channels(ChannelKind::Calcium);
            debug!("Pulse at {:.3}: {} calcium channels open", position, opened);
            self.schedule(
                now,
                self.config.delays.calcium_to_stage_ms,
                TransitionEvent::EnterStage(Stage::CalciumOpen),
            );
        }

        if position >= self.config.release_threshold
            && self.stage.current() == Stage::CalciumOpen
            && !self.guards.release_triggered
        {
            self.guards.release_triggered = true;
            let outcome = self.sampler.maybe_release(
                &mut self.entities.vesicles,
                &mut self.transmitters,
                now,
                &mut self.rng,
            );
            self.stats.vesicles_released += outcome.released.len() as u64;
            self.stats.transmitters_spawned += outcome.spawned as u64;

            if outcome.released.is_empty() {
                warn!("No vesicle released this cycle; transmission stalls until pause or reset");
            }
            self.schedule(
                now,
                self.config.delays.release_to_stage_ms,
                TransitionEvent::EnterStage(Stage::VesicleRelease),
            );
        }
    }

    fn advance_transmitters(&mut self, now: Duration) {
        let outcome = self.transmitters.tick(now, self.config.bind_threshold);

        let Some(particle) = outcome.first_crossing else {
            return;
        };
        if self.stage.current() != Stage::VesicleRelease || self.guards.bind_triggered {
            return;
        }

        self.guards.bind_triggered = true;
        self.schedule(
            now,
            self.config.delays.bind_to_stage_ms,
            TransitionEvent::EnterStage(Stage::ReceptorBinding),
        );

        match self.entities.bind_first_unbound() {
            Some(receptor) => {
                self.stats.receptors_bound += 1;
                debug!("Neurotransmitter {} bound receptor {}", particle, receptor);
                self.schedule(
                    now,
                    self.config.delays.bind_to_response_ms,
                    TransitionEvent::TriggerPostsynaptic,
                );
            }
            None => warn!("Neurotransmitter {} found no unbound receptor", particle),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Deferred transitions
    // ─────────────────────────────────────────────────────────────

    fn schedule(&mut self, now: Duration, delay_ms: u64, event: TransitionEvent) {
        self.scheduler
            .schedule(now, Duration::from_millis(delay_ms), event);
    }

    fn apply(&mut self, event: TransitionEvent, at: Duration) {
        if !self.is_playing {
            debug!("Ignoring {:?} while stopped", event);
            return;
        }

        match event {
            TransitionEvent::EnterStage(stage) => self.enter_stage(stage, at),
            TransitionEvent::TriggerPostsynaptic => {
                self.entities.open_channels(ChannelKind::Sodium);
                self.effects.spawn(
                    EffectKind::Depolarization {
                        center: Vector3::from(POSTSYNAPTIC_CENTER),
                    },
                    at,
                    Duration::from_millis(self.config.delays.depolarization_visual_ms),
                );
                self.schedule(
                    at,
                    self.config.delays.response_to_stage_ms,
                    TransitionEvent::EnterStage(Stage::PostsynapticResponse),
                );
                self.schedule(
                    at,
                    self.config.delays.depolarization_visual_ms,
                    TransitionEvent::DepolarizationComplete,
                );
            }
            TransitionEvent::DepolarizationComplete => {
                self.schedule(
                    at,
                    self.config.delays.depolarization_to_reset_ms,
                    TransitionEvent::ResetCycle,
                );
            }
            TransitionEvent::ResetCycle => self.reset_cycle(at),
            TransitionEvent::StartCycle => self.begin_cycle(at),
        }
    }

    fn enter_stage(&mut self, stage: Stage, at: Duration) {
        match self.stage.advance(stage, at) {
            Ok(transition) => info!(
                "Stage {} -> {} at {}ms",
                transition.from,
                transition.to,
                at.as_millis()
            ),
            Err(e) => {
                self.stats.rejected_transitions += 1;
                warn!("Rejected stage entry: {}", e);
            }
        }
    }

    /// Launches the next action potential, or halts at the loop limit.
    fn begin_cycle(&mut self, at: Duration) {
        if self.loop_count >= self.config.max_loops {
            self.halt(at);
            return;
        }

        self.guards = CycleGuards::default();
        let id = self.pulses.spawn(
            self.config.pulse_start,
            self.config.pulse_speed,
            self.config.pulse_amplitude,
        );
        self.cycle_pulse = Some(id);
        self.stats.cycles_started += 1;

        info!(
            "Cycle {}/{} started at {}ms",
            self.loop_count + 1,
            self.config.max_loops,
            at.as_millis()
        );
        self.enter_stage(Stage::Depolarizing, at);
    }

    /// Ends a completed cycle: back to idle, entities restored.
    fn reset_cycle(&mut self, at: Duration) {
        match self.stage.complete_cycle(at) {
            Ok(_) => self.stats.cycles_completed += 1,
            Err(e) => {
                self.stats.rejected_transitions += 1;
                warn!("Cycle reset outside the response stage: {}", e);
                self.stage.return_to_idle(at);
            }
        }
        self.entities.restore();
        self.guards = CycleGuards::default();
        self.cycle_pulse = None;

        if self.is_playing {
            self.loop_count += 1;
            self.schedule(
                at,
                self.config.delays.reset_to_restart_ms,
                TransitionEvent::StartCycle,
            );
        }
    }

    fn halt(&mut self, at: Duration) {
        self.is_playing = false;
        self.scheduler.cancel_all();
        self.stage.return_to_idle(at);
        self.loop_count = 0;
        self.stats.halts += 1;
        info!("■ Loop limit of {} reached; playback halted", self.config.max_loops);
    }

    /// Clears everything a cycle may have left in flight.
    fn clear_cycle(&mut self, at: Duration) {
        self.stage.return_to_idle(at);
        self.entities.restore();
        self.pulses.clear();
        self.transmitters.clear();
        self.effects.clear();
        self.guards = CycleGuards::default();
        self.cycle_pulse = None;
    }

    // ─────────────────────────────────────────────────────────────
    // Renderer boundary (read-only)
    // ─────────────────────────────────────────────────────────────

    pub fn stage(&self) -> Stage {
        self.stage.current()
    }

    pub fn history(&self) -> &[StageTransition] {
        self.stage.history()
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn config(&self) -> &SynapseConfig {
        &self.config
    }

    pub fn channels(&self) -> &[IonChannel] {
        self.entities.channels.as_slice()
    }

    pub fn vesicles(&self) -> &[Vesicle] {
        self.entities.vesicles.as_slice()
    }

    pub fn receptors(&self) -> &[Receptor] {
        self.entities.receptors.as_slice()
    }

    pub fn transmitters(&self) -> &[Neurotransmitter] {
        self.transmitters.particles()
    }

    pub fn action_potentials(&self) -> &[ActionPotential] {
        self.pulses.pulses()
    }

    pub fn effects(&self) -> &[VisualEffect] {
        self.effects.effects()
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn guards(&self) -> CycleGuards {
        self.guards
    }

    /// Live transition timers.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Timers dropped because pause, reset or a halt cancelled them.
    pub fn stale_timers_discarded(&self) -> u64 {
        self.scheduler.stale_discarded()
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Returns true when every entity collection is in its initial state.
    pub fn is_pristine(&self) -> bool {
        self.entities.is_pristine()
            && self.transmitters.is_empty()
            && self.pulses.is_empty()
    }
}
