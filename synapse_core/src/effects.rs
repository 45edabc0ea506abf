//! Transient visual effects.
//!
//! Effects carry no simulation contract; they exist so a renderer can draw
//! the axon flash and postsynaptic depolarization with the right timing.

use crate::entities::{EntityArena, EntityId, Identified};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What an effect depicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Flash and ring around a pulse near the terminal
    Electrical { x: f64 },

    /// Expanding glow over the postsynaptic membrane
    Depolarization { center: Vector3<f64> },
}

/// A running visual effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualEffect {
    pub id: EntityId,
    pub kind: EffectKind,
    pub born: Duration,
    pub duration: Duration,
}

impl VisualEffect {
    /// Elapsed fraction of the effect, clamped to `[0, 1]`.
    pub fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (now.saturating_sub(self.born).as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        now.saturating_sub(self.born) >= self.duration
    }
}

impl Identified for VisualEffect {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Owns the running effects.
#[derive(Debug, Clone, Default)]
pub struct EffectLayer {
    effects: EntityArena<VisualEffect>,
}

impl EffectLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an effect at `now` lasting `duration`.
    pub fn spawn(&mut self, kind: EffectKind, now: Duration, duration: Duration) -> EntityId {
        self.effects.insert_with(|id| VisualEffect {
            id,
            kind,
            born: now,
            duration,
        })
    }

    /// Drops finished effects. Returns how many were dropped.
    pub fn expire(&mut self, now: Duration) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| !e.is_finished(now));
        before - self.effects.len()
    }

    pub fn effects(&self) -> &[VisualEffect] {
        self.effects.as_slice()
    }

    /// Number of running depolarization effects.
    #[cfg(test)]
    pub fn depolarizations(&self) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e.kind, EffectKind::Depolarization { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_expires_after_duration() {
        let mut layer = EffectLayer::new();
        layer.spawn(
            EffectKind::Electrical { x: 0.0 },
            Duration::from_millis(100),
            Duration::from_millis(600),
        );

        assert_eq!(layer.expire(Duration::from_millis(699)), 0);
        assert_eq!(layer.expire(Duration::from_millis(700)), 1);
        assert!(layer.is_empty());
    }

    #[test]
    fn test_progress_clamped() {
        let mut layer = EffectLayer::new();
        layer.spawn(
            EffectKind::Depolarization {
                center: Vector3::new(1.0, 0.0, 0.0),
            },
            Duration::ZERO,
            Duration::from_millis(1000),
        );
        let effect = &layer.effects()[0];

        assert_eq!(effect.progress(Duration::from_millis(250)), 0.25);
        assert_eq!(effect.progress(Duration::from_secs(5)), 1.0);
        assert_eq!(layer.depolarizations(), 1);
    }
}
