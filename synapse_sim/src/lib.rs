//! Synapse Deterministic Simulation Harness
//!
//! Drives the synaptic-transmission controller on a virtual clock so that
//! every run is reproducible from a single 64-bit seed.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advances exactly one frame interval per frame
//! - **Randomness**: Placement and release sampling derive from the seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                      │
//! │  ┌──────────────┐    frame(now)   ┌────────────────┐  │
//! │  │  SimContext  │ ──────────────► │   Simulation   │  │
//! │  │ (virtual ns) │                 │   Controller   │  │
//! │  └──────────────┘                 └───────┬────────┘  │
//! │                                           │ read-only │
//! │                                   ┌───────▼────────┐  │
//! │                                   │     Oracle     │  │
//! │                                   └────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use synapse_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::FullRun);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::SimExport;
pub use oracle::{audit_history, AuditReport, TransmissionOracle};
pub use runner::{
    crossing_frame, drive, ScenarioMetrics, ScenarioResult, ScenarioRunner, CONTROLLER_STREAM,
};
