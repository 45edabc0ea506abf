//! Core environment context trait for the synapse render loop.

use crate::EnvError;
use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// This trait abstracts the display clock so that the simulation core can
/// be driven by a real render loop or by a deterministic harness.
///
/// # Implementations
///
/// - **Realtime**: `RealtimeContext` - wraps `tokio::time`, entropy-seeded RNG
/// - **Virtual**: `SimContext` (in `synapse_sim`) - manual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// Methods that would normally introduce non-determinism (time, randomness)
/// are controlled by the implementation.
#[async_trait]
pub trait SynapseContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Neurotransmitter ages and transition timers are measured against it.
    fn now(&self) -> Duration;

    /// Returns the nominal interval between two display frames.
    fn frame_interval(&self) -> Duration;

    /// Waits for the next display frame.
    ///
    /// Realtime: sleeps until the next frame boundary.
    /// Virtual: advances the clock by one frame interval.
    async fn next_frame(&self);

    /// Derives a random source from the context seed.
    ///
    /// The implementation combines the global seed with `stream` so that
    /// independent consumers (release sampling, particle jitter, placement)
    /// get unique but reproducible sequences.
    fn derive_rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// Realtime contexts return 0 (not seeded).
    fn seed(&self) -> u64;
}

/// Converts a display rate into a frame interval.
pub fn frame_interval_for(fps: u32) -> Result<Duration, EnvError> {
    if fps == 0 {
        return Err(EnvError::InvalidFrameRate(fps));
    }
    Ok(Duration::from_nanos(1_000_000_000 / u64::from(fps)))
}
