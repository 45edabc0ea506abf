//! Simulation parameters.
//!
//! Every default here is a behavioral constant: pulse increment, trigger
//! thresholds, release probability, particle lifetime and the stage delay
//! table are reproduced exactly so that the animation paces identically.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delays (milliseconds) of the one-shot transitions and timed visuals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayTable {
    /// Calcium channels open -> `CalciumOpen`
    pub calcium_to_stage_ms: u64,

    /// Vesicles sampled -> `VesicleRelease`
    pub release_to_stage_ms: u64,

    /// Receptor bound -> `ReceptorBinding`
    pub bind_to_stage_ms: u64,

    /// Receptor bound -> postsynaptic response triggered
    pub bind_to_response_ms: u64,

    /// Postsynaptic response triggered -> `PostsynapticResponse`
    pub response_to_stage_ms: u64,

    /// Depolarization visual lifetime
    pub depolarization_visual_ms: u64,

    /// Depolarization visual complete -> cycle reset
    pub depolarization_to_reset_ms: u64,

    /// Cycle reset -> next action potential
    pub reset_to_restart_ms: u64,

    /// Electrical flash lifetime along the axon
    pub electrical_visual_ms: u64,
}

impl Default for DelayTable {
    fn default() -> Self {
        Self {
            calcium_to_stage_ms: 300,
            release_to_stage_ms: 400,
            bind_to_stage_ms: 200,
            bind_to_response_ms: 500,
            response_to_stage_ms: 300,
            depolarization_visual_ms: 1000,
            depolarization_to_reset_ms: 800,
            reset_to_restart_ms: 1800,
            electrical_visual_ms: 600,
        }
    }
}

impl DelayTable {
    /// Returns the delays as `(field, value)` pairs for validation.
    fn entries(&self) -> [(&'static str, u64); 9] {
        [
            ("calcium_to_stage_ms", self.calcium_to_stage_ms),
            ("release_to_stage_ms", self.release_to_stage_ms),
            ("bind_to_stage_ms", self.bind_to_stage_ms),
            ("bind_to_response_ms", self.bind_to_response_ms),
            ("response_to_stage_ms", self.response_to_stage_ms),
            ("depolarization_visual_ms", self.depolarization_visual_ms),
            ("depolarization_to_reset_ms", self.depolarization_to_reset_ms),
            ("reset_to_restart_ms", self.reset_to_restart_ms),
            ("electrical_visual_ms", self.electrical_visual_ms),
        ]
    }
}

/// Number of entity records created at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Populations {
    pub sodium_channels: usize,
    pub potassium_channels: usize,
    pub calcium_channels: usize,
    pub vesicles: usize,
    pub ampa_receptors: usize,
    pub nmda_receptors: usize,
}

impl Default for Populations {
    fn default() -> Self {
        Self {
            sodium_channels: 8,
            potassium_channels: 6,
            calcium_channels: 4,
            vesicles: 20,
            ampa_receptors: 10,
            nmda_receptors: 6,
        }
    }
}

/// Complete configuration of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseConfig {
    /// Master seed for placement and release sampling
    pub seed: u64,

    /// Display rate the per-frame speeds are tuned for
    pub fps: u32,

    /// Axon coordinate where each action potential is spawned
    pub pulse_start: f64,

    /// Axon distance travelled per frame
    pub pulse_speed: f64,

    /// Pulse amplitude (presentation)
    pub pulse_amplitude: f64,

    /// Pulses past this coordinate are removed
    pub travel_bound: f64,

    /// Pulse position that opens calcium channels
    pub calcium_threshold: f64,

    /// Pulse position that samples vesicle release
    pub release_threshold: f64,

    /// Particle x-coordinate past which a receptor binds
    pub bind_threshold: f64,

    /// Half-width of the axon window that flashes as a pulse passes
    pub electrical_window: f64,

    /// Bernoulli probability of releasing each unreleased vesicle
    pub release_probability: f64,

    /// Neurotransmitter records spawned per released vesicle
    pub burst_size: usize,

    /// Forward (x) particle velocity per frame
    pub particle_speed: f64,

    /// Half-range of the lateral (y, z) particle velocity jitter
    pub lateral_jitter: f64,

    /// Half-range of the particle spawn offset around the vesicle
    pub spawn_offset: f64,

    /// Neurotransmitter lifetime in milliseconds
    pub neurotransmitter_lifetime_ms: u64,

    /// Full transmission cycles auto-run per start
    pub max_loops: u32,

    /// Setup populations
    pub populations: Populations,

    /// Transition delays
    pub delays: DelayTable,
}

impl Default for SynapseConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fps: 60,
            pulse_start: -8.0,
            pulse_speed: 0.040,
            pulse_amplitude: 1.0,
            travel_bound: 10.0,
            calcium_threshold: -1.2,
            release_threshold: -0.3,
            bind_threshold: 0.6,
            electrical_window: 2.5,
            release_probability: 0.3,
            burst_size: 8,
            particle_speed: 0.025,
            lateral_jitter: 0.003,
            spawn_offset: 0.15,
            neurotransmitter_lifetime_ms: 2500,
            max_loops: 3,
            populations: Populations::default(),
            delays: DelayTable::default(),
        }
    }
}

impl SynapseConfig {
    /// Parses a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and threshold ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 {
            return Err(ConfigError::out_of_range("fps", self.fps));
        }
        if !(self.pulse_speed.is_finite() && self.pulse_speed > 0.0) {
            return Err(ConfigError::out_of_range("pulse_speed", self.pulse_speed));
        }
        if !(0.0..=1.0).contains(&self.release_probability) {
            return Err(ConfigError::out_of_range(
                "release_probability",
                self.release_probability,
            ));
        }
        if self.burst_size == 0 {
            return Err(ConfigError::out_of_range("burst_size", 0.0));
        }
        if self.neurotransmitter_lifetime_ms == 0 {
            return Err(ConfigError::out_of_range("neurotransmitter_lifetime_ms", 0.0));
        }
        if self.max_loops == 0 {
            return Err(ConfigError::out_of_range("max_loops", 0.0));
        }
        for (field, value) in [
            ("lateral_jitter", self.lateral_jitter),
            ("spawn_offset", self.spawn_offset),
            ("electrical_window", self.electrical_window),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::out_of_range(field, value));
            }
        }
        for (field, value) in self.delays.entries() {
            if value == 0 {
                return Err(ConfigError::out_of_range(field, 0.0));
            }
        }

        let ordered = self.pulse_start < self.calcium_threshold
            && self.calcium_threshold < self.release_threshold
            && self.release_threshold < self.travel_bound;
        if !ordered {
            return Err(ConfigError::ThresholdOrder);
        }

        Ok(())
    }

    /// Neurotransmitter lifetime as a duration.
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.neurotransmitter_lifetime_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_timing_constants() {
        let config = SynapseConfig::default();
        assert_eq!(config.pulse_speed, 0.040);
        assert_eq!(config.calcium_threshold, -1.2);
        assert_eq!(config.release_threshold, -0.3);
        assert_eq!(config.release_probability, 0.3);
        assert_eq!(config.bind_threshold, 0.6);
        assert_eq!(config.lifetime(), Duration::from_millis(2500));
        assert_eq!(config.max_loops, 3);

        let d = &config.delays;
        assert_eq!(
            [
                d.calcium_to_stage_ms,
                d.release_to_stage_ms,
                d.bind_to_stage_ms,
                d.bind_to_response_ms,
                d.response_to_stage_ms,
                d.depolarization_to_reset_ms,
                d.reset_to_restart_ms,
            ],
            [300, 400, 200, 500, 300, 800, 1800]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overlays_defaults() {
        let json = r#"{"seed": 7, "delays": {"reset_to_restart_ms": 900}}"#;
        let config = SynapseConfig::from_json(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.delays.reset_to_restart_ms, 900);
        assert_eq!(config.delays.calcium_to_stage_ms, 300);
        assert_eq!(config.populations.vesicles, 20);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let config = SynapseConfig {
            release_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "release_probability", .. })
        ));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let config = SynapseConfig {
            calcium_threshold: 0.0,
            release_threshold: -0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdOrder)));
    }

    #[test]
    fn test_rejects_zero_delay() {
        let mut config = SynapseConfig::default();
        config.delays.bind_to_stage_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            SynapseConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
