//! Neurotransmitter particle lifecycle.
//!
//! Particles drift across the cleft at a constant per-frame velocity, fade
//! over their lifetime and are removed, irreversibly, once
//! `age >= lifetime`.

use crate::entities::{EntityArena, EntityId, Neurotransmitter};
use nalgebra::Vector3;
use rand::Rng;
use std::time::Duration;

/// Parameters of a particle burst from one vesicle.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstParams {
    /// Particles per burst
    pub size: usize,

    /// Forward (x) displacement per frame, shared by all particles
    pub forward_speed: f64,

    /// Half-range of the lateral (y, z) velocity jitter
    pub lateral_jitter: f64,

    /// Half-range of the spawn offset around the vesicle
    pub spawn_offset: f64,

    pub lifetime: Duration,
}

/// Result of one lifecycle tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Particles removed for reaching their lifetime
    pub expired: usize,

    /// First live particle (iteration order) past the binding threshold
    pub first_crossing: Option<EntityId>,
}

/// Owns every live neurotransmitter particle.
#[derive(Debug, Clone, Default)]
pub struct NeurotransmitterPool {
    particles: EntityArena<Neurotransmitter>,
}

impl NeurotransmitterPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a burst around `origin`, born at `now`.
    pub fn spawn_burst<R: Rng + ?Sized>(
        &mut self,
        origin: Vector3<f64>,
        params: &BurstParams,
        now: Duration,
        rng: &mut R,
    ) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(params.size);
        for _ in 0..params.size {
            let offset = Vector3::new(
                symmetric(rng, params.spawn_offset),
                symmetric(rng, params.spawn_offset),
                symmetric(rng, params.spawn_offset),
            );
            let velocity = Vector3::new(
                params.forward_speed,
                symmetric(rng, params.lateral_jitter),
                symmetric(rng, params.lateral_jitter),
            );
            let id = self.particles.insert_with(|id| Neurotransmitter {
                id,
                position: origin + offset,
                velocity,
                birth: now,
                lifetime: params.lifetime,
                opacity: 0.9,
                glow: 0.4,
                scale: 1.0,
            });
            ids.push(id);
        }
        ids
    }

    /// Advances every particle by one frame at clock time `now`.
    ///
    /// Expired particles are removed before moving; survivors move, float,
    /// fade, and are checked against `bind_threshold` on their new x.
    pub fn tick(&mut self, now: Duration, bind_threshold: f64) -> TickOutcome {
        let before = self.particles.len();
        self.particles.retain(|nt| !nt.is_expired(now));
        let expired = before - self.particles.len();

        let t_ms = now.as_secs_f64() * 1000.0;
        let mut first_crossing = None;

        for nt in self.particles.iter_mut() {
            nt.position += nt.velocity;

            // Float and pulse are phase-shifted per particle
            let phase = nt.id as f64;
            nt.position.y += ((t_ms + phase * 100.0) * 0.005).sin() * 0.005;
            nt.scale = (t_ms * 0.01 + phase).sin() * 0.2 + 1.0;

            let fade = nt.fade(now);
            nt.opacity = 0.9 * (1.0 - fade * 0.8);
            nt.glow = 0.4 * (1.0 - fade * 0.5);

            if first_crossing.is_none() && nt.position.x > bind_threshold {
                first_crossing = Some(nt.id);
            }
        }

        TickOutcome {
            expired,
            first_crossing,
        }
    }

    pub fn particles(&self) -> &[Neurotransmitter] {
        self.particles.as_slice()
    }

    #[cfg(test)]
    pub fn get(&self, id: EntityId) -> Option<&Neurotransmitter> {
        self.particles.get(id)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

/// Uniform sample in `[-half_range, half_range)`.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, half_range: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * 2.0 * half_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> BurstParams {
        BurstParams {
            size: 8,
            forward_speed: 0.025,
            lateral_jitter: 0.003,
            spawn_offset: 0.15,
            lifetime: Duration::from_millis(2500),
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_burst_spawns_fixed_size() {
        let mut pool = NeurotransmitterPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ids = pool.spawn_burst(Vector3::new(-0.5, 0.0, 0.0), &params(), ms(0), &mut rng);

        assert_eq!(ids.len(), 8);
        assert_eq!(pool.len(), 8);
        for nt in pool.particles() {
            assert!((nt.position.x + 0.5).abs() <= 0.15);
            assert_eq!(nt.velocity.x, 0.025);
            assert!(nt.velocity.y.abs() <= 0.003);
        }
    }

    #[test]
    fn test_removed_exactly_at_lifetime() {
        let mut pool = NeurotransmitterPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        pool.spawn_burst(Vector3::zeros(), &params(), ms(1000), &mut rng);

        let outcome = pool.tick(ms(3499), 100.0);
        assert_eq!(outcome.expired, 0);
        assert_eq!(pool.len(), 8);

        let outcome = pool.tick(ms(3500), 100.0);
        assert_eq!(outcome.expired, 8);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_moves_forward_each_tick() {
        let mut pool = NeurotransmitterPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let id = pool.spawn_burst(Vector3::zeros(), &params(), ms(0), &mut rng)[0];
        let start_x = pool.get(id).unwrap().position.x;

        for frame in 1..=10 {
            pool.tick(ms(frame * 16), 100.0);
        }

        assert_relative_eq!(pool.get(id).unwrap().position.x, start_x + 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_fade_is_monotonic() {
        let mut pool = NeurotransmitterPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let id = pool.spawn_burst(Vector3::zeros(), &params(), ms(0), &mut rng)[0];

        let mut last_opacity = f64::MAX;
        let mut last_glow = f64::MAX;
        for step in 1..25 {
            pool.tick(ms(step * 100), 100.0);
            let nt = pool.get(id).unwrap();
            assert!(nt.opacity < last_opacity);
            assert!(nt.glow < last_glow);
            last_opacity = nt.opacity;
            last_glow = nt.glow;
        }
    }

    #[test]
    fn test_first_crossing_in_iteration_order() {
        let mut pool = NeurotransmitterPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        pool.spawn_burst(Vector3::new(-1.0, 0.0, 0.0), &params(), ms(0), &mut rng);
        let far = pool.spawn_burst(Vector3::new(2.0, 0.0, 0.0), &params(), ms(0), &mut rng);

        let outcome = pool.tick(ms(16), 0.6);
        assert_eq!(outcome.first_crossing, Some(far[0]));
    }

    #[test]
    fn test_no_crossing_below_threshold() {
        let mut pool = NeurotransmitterPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        pool.spawn_burst(Vector3::new(-0.5, 0.0, 0.0), &params(), ms(0), &mut rng);

        assert_eq!(pool.tick(ms(16), 0.6).first_crossing, None);
    }
}
