//! Realtime implementation of SynapseContext using Tokio.

use crate::{frame_interval_for, EnvError, SynapseContext};
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

/// Realtime context backed by Tokio and OS entropy.
///
/// This is the "real" implementation used when a renderer is attached.
/// Time comes from the system monotonic clock, randomness from the OS.
pub struct RealtimeContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Target interval between frames
    frame_interval: Duration,
}

impl RealtimeContext {
    /// Creates a new RealtimeContext pacing frames at `fps`.
    pub fn new(fps: u32) -> Result<Self, EnvError> {
        Ok(Self {
            start: Instant::now(),
            frame_interval: frame_interval_for(fps)?,
        })
    }

    /// Returns the next frame boundary strictly after `elapsed`.
    fn next_boundary(&self, elapsed: Duration) -> Duration {
        let interval_ns = self.frame_interval.as_nanos().max(1);
        let frames = elapsed.as_nanos() / interval_ns + 1;
        Duration::from_nanos(u64::try_from(frames * interval_ns).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl SynapseContext for RealtimeContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    async fn next_frame(&self) {
        let target = self.start + self.next_boundary(self.start.elapsed());
        tokio::time::sleep_until(tokio::time::Instant::from_std(target)).await;
    }

    fn derive_rng(&self, _stream: u64) -> ChaCha8Rng {
        // Realtime runs are not reproducible
        ChaCha8Rng::seed_from_u64(rand::random())
    }

    fn seed(&self) -> u64 {
        0
    }
}
