//! Synapse Environment Abstraction Layer
//!
//! This crate provides the seam that lets the synapse simulation core run
//! against either a **Realtime** clock (tokio, display-rate frames) or a
//! **Virtual** clock (deterministic harness).
//!
//! # Core Concept: Frame-Driven Reactor
//!
//! The simulation is single-threaded and cooperative. Everything that would
//! normally make a run irreproducible is routed through [`SynapseContext`]:
//! - Time (`now()`, `next_frame()`)
//! - Randomness (`derive_rng()`)
//!
//! By deriving all entropy from a single 64-bit seed, any odd-looking run
//! can be replayed from its seed number.
//!
//! # Example
//!
//! ```ignore
//! use synapse_env::SynapseContext;
//!
//! async fn render_loop<Ctx: SynapseContext>(ctx: &Ctx, controller: &mut SimulationController) {
//!     loop {
//!         ctx.next_frame().await;
//!         controller.frame(ctx.now());
//!     }
//! }
//! ```

mod context;
mod error;
mod realtime;

pub use context::{frame_interval_for, SynapseContext};
pub use error::EnvError;
pub use realtime::RealtimeContext;
