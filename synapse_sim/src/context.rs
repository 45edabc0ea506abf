//! Simulation context implementing SynapseContext for deterministic runs.

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synapse_env::{frame_interval_for, EnvError, SynapseContext};

/// Simulation context backed by a virtual clock and seeded RNG.
///
/// This implements `SynapseContext` using:
/// - A virtual clock that only moves when a frame is requested
/// - Seeded ChaCha8 streams for every random consumer
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<AtomicU64>,

    /// Virtual time added per frame
    frame_interval: Duration,
}

impl SimContext {
    /// Creates a new SimContext with the given seed and display rate.
    pub fn new(seed: u64, fps: u32) -> Result<Self, EnvError> {
        Ok(Self {
            seed,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            frame_interval: frame_interval_for(fps)?,
        })
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.virtual_time_ns.fetch_add(ns, Ordering::SeqCst);
    }

    /// Advances virtual time by one frame.
    pub fn advance_frame(&self) {
        self.advance_time(self.frame_interval);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::SeqCst)
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            frame_interval: self.frame_interval,
        }
    }
}

#[async_trait]
impl SynapseContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    async fn next_frame(&self) {
        // Virtual frames never wait
        self.advance_frame();
    }

    fn derive_rng(&self, stream: u64) -> ChaCha8Rng {
        // Combine master seed with stream for an independent sequence
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ stream;
        ChaCha8Rng::seed_from_u64(combined_seed)
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42, 60).unwrap();
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_next_frame_advances_one_interval() {
        let ctx = SimContext::new(42, 50).unwrap();
        ctx.next_frame().await;
        ctx.next_frame().await;
        assert_eq!(ctx.now(), Duration::from_millis(40));
    }

    #[test]
    fn test_sim_context_deterministic_streams() {
        let ctx1 = SimContext::new(42, 60).unwrap();
        let ctx2 = SimContext::new(42, 60).unwrap();

        // Same seed + stream = same sequence
        assert_eq!(ctx1.derive_rng(1).next_u64(), ctx2.derive_rng(1).next_u64());

        // Different stream = different sequence
        assert_ne!(ctx1.derive_rng(1).next_u64(), ctx1.derive_rng(2).next_u64());
    }

    #[test]
    fn test_sim_context_seed() {
        let ctx = SimContext::new(12345, 60).unwrap();
        assert_eq!(ctx.seed(), 12345);
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42, 60).unwrap();
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        // Both should see the same time
        assert_eq!(ctx1.now(), ctx2.now());
    }
}
