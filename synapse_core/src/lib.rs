//! Synapse Core - Stage Orchestration for a Synaptic Transmission Animation
//!
//! An action potential travels down the axon, opens calcium channels,
//! triggers vesicle release, neurotransmitter crosses the cleft, binds a
//! receptor and depolarizes the postsynaptic membrane. This crate owns the
//! timing of that sequence; drawing it is left to a renderer that reads a
//! [`Snapshot`] (or the controller's slices) each frame.
//!
//! 1. **Stage machine**: strictly ordered `0 -> 1 -> ... -> 5 -> 0` indicator
//! 2. **Transition timers**: fire-once delays cancelled by generation tokens
//! 3. **Trackers**: action potentials, vesicle release, neurotransmitters

pub mod action_potential;
pub mod config;
pub mod controller;
pub mod effects;
pub mod entities;
pub mod neurotransmitter;
pub mod release;
pub mod scheduler;
pub mod snapshot;
pub mod stage;
pub mod view;
mod error;

// Re-export key types for convenience
pub use config::{DelayTable, Populations, SynapseConfig};
pub use controller::{ControllerStats, CycleGuards, SimulationController};
pub use entities::{ChannelKind, EntityId, ReceptorKind};
pub use error::{ConfigError, StageError};
pub use snapshot::Snapshot;
pub use stage::{Stage, StageTransition};
