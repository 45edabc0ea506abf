//! Vesicle release sampling.

use crate::config::SynapseConfig;
use crate::entities::{EntityArena, EntityId, Vesicle};
use crate::neurotransmitter::{BurstParams, NeurotransmitterPool};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Outcome of one sampling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Vesicles released by this pass
    pub released: Vec<EntityId>,

    /// Neurotransmitter records spawned
    pub spawned: usize,
}

/// Independent Bernoulli trial per unreleased vesicle.
///
/// Called once per `VesicleRelease` entry. The expected released fraction
/// is `probability`; no particular vesicle is guaranteed to ever release.
#[derive(Debug, Clone)]
pub struct ReleaseSampler {
    probability: f64,
    burst: BurstParams,
}

impl ReleaseSampler {
    /// Creates a sampler releasing with `probability` and spawning `burst`.
    pub fn new(probability: f64, burst: BurstParams) -> Self {
        Self { probability, burst }
    }

    /// Builds the sampler described by `config`.
    pub fn from_config(config: &SynapseConfig) -> Self {
        Self::new(
            config.release_probability,
            BurstParams {
                size: config.burst_size,
                forward_speed: config.particle_speed,
                lateral_jitter: config.lateral_jitter,
                spawn_offset: config.spawn_offset,
                lifetime: config.lifetime(),
            },
        )
    }

    /// Runs one trial per unreleased vesicle; each success spawns a burst.
    pub fn maybe_release<R: Rng + ?Sized>(
        &self,
        vesicles: &mut EntityArena<Vesicle>,
        transmitters: &mut NeurotransmitterPool,
        now: Duration,
        rng: &mut R,
    ) -> ReleaseOutcome {
        let mut outcome = ReleaseOutcome::default();

        for vesicle in vesicles.iter_mut().filter(|v| !v.released()) {
            if rng.gen::<f64>() >= self.probability {
                continue;
            }
            vesicle.release(now);
            let spawned = transmitters.spawn_burst(vesicle.position, &self.burst, now, rng);
            outcome.spawned += spawned.len();
            outcome.released.push(vesicle.id);
        }

        debug!(
            "Release sampled: {} vesicles, {} neurotransmitters",
            outcome.released.len(),
            outcome.spawned
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Populations;
    use crate::entities::EntityStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(vesicles: usize, seed: u64) -> (EntityStore, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let populations = Populations {
            vesicles,
            ..Default::default()
        };
        (EntityStore::populate(&populations, &mut rng), rng)
    }

    #[test]
    fn test_each_release_spawns_full_burst() {
        let sampler = ReleaseSampler::from_config(&SynapseConfig::default());
        let (mut store, mut rng) = setup(20, 42);
        let mut pool = NeurotransmitterPool::new();

        let outcome = sampler.maybe_release(
            &mut store.vesicles,
            &mut pool,
            Duration::from_millis(5),
            &mut rng,
        );

        assert_eq!(outcome.spawned, outcome.released.len() * 8);
        assert_eq!(pool.len(), outcome.spawned);
        for id in &outcome.released {
            let vesicle = store.vesicles.get(*id).unwrap();
            assert_eq!(vesicle.release_time, Some(Duration::from_millis(5)));
        }
    }

    #[test]
    fn test_released_fraction_near_probability() {
        let sampler = ReleaseSampler::from_config(&SynapseConfig::default());
        let (mut store, mut rng) = setup(2000, 7);
        let mut pool = NeurotransmitterPool::new();

        let outcome =
            sampler.maybe_release(&mut store.vesicles, &mut pool, Duration::ZERO, &mut rng);

        // Binomial(2000, 0.3): mean 600, sd ~20.5; allow 5 sd
        let released = outcome.released.len();
        assert!((497..=703).contains(&released), "released {released}");
    }

    #[test]
    fn test_same_seed_same_release() {
        let sampler = ReleaseSampler::from_config(&SynapseConfig::default());
        let run = || {
            let (mut store, mut rng) = setup(20, 99);
            let mut pool = NeurotransmitterPool::new();
            sampler
                .maybe_release(&mut store.vesicles, &mut pool, Duration::ZERO, &mut rng)
                .released
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_released_vesicles_not_resampled() {
        let sampler = ReleaseSampler::from_config(&SynapseConfig {
            release_probability: 1.0,
            ..Default::default()
        });
        let (mut store, mut rng) = setup(5, 1);
        let mut pool = NeurotransmitterPool::new();

        let first =
            sampler.maybe_release(&mut store.vesicles, &mut pool, Duration::ZERO, &mut rng);
        let second =
            sampler.maybe_release(&mut store.vesicles, &mut pool, Duration::ZERO, &mut rng);

        assert_eq!(first.released.len(), 5);
        assert!(second.released.is_empty());
        assert_eq!(pool.len(), 40);
    }

    #[test]
    fn test_zero_probability_releases_nothing() {
        let sampler = ReleaseSampler::from_config(&SynapseConfig {
            release_probability: 0.0,
            ..Default::default()
        });
        let (mut store, mut rng) = setup(20, 3);
        let mut pool = NeurotransmitterPool::new();

        let outcome =
            sampler.maybe_release(&mut store.vesicles, &mut pool, Duration::ZERO, &mut rng);
        assert!(outcome.released.is_empty());
        assert!(pool.is_empty());
    }
}
