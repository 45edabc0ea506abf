//! Travelling action potentials along the axon axis.

use crate::entities::{ActionPotential, EntityArena, EntityId};

/// Tracks every pulse currently travelling along the axon.
///
/// Speeds are per-frame increments, so pulse timing follows the display
/// rate rather than wall-clock time.
#[derive(Debug, Clone)]
pub struct ActionPotentialTracker {
    pulses: EntityArena<ActionPotential>,
    travel_bound: f64,
}

impl ActionPotentialTracker {
    /// Creates an empty tracker; pulses past `travel_bound` are removed.
    pub fn new(travel_bound: f64) -> Self {
        Self {
            pulses: EntityArena::new(),
            travel_bound,
        }
    }

    /// Launches a pulse at `position`.
    pub fn spawn(&mut self, position: f64, speed: f64, amplitude: f64) -> EntityId {
        self.pulses.insert_with(|id| ActionPotential {
            id,
            position,
            speed,
            amplitude,
            active: true,
        })
    }

    /// Moves every pulse forward one frame.
    ///
    /// A pulse past the travel bound goes inactive and is dropped; returns
    /// how many were dropped.
    pub fn advance(&mut self) -> usize {
        for pulse in self.pulses.iter_mut() {
            pulse.position += pulse.speed;
            pulse.active = pulse.position <= self.travel_bound;
        }

        let before = self.pulses.len();
        self.pulses.retain(|p| p.active);
        before - self.pulses.len()
    }

    /// Current position of the pulse with the given id, if still travelling.
    pub fn position(&self, id: EntityId) -> Option<f64> {
        self.pulses.get(id).map(|p| p.position)
    }

    /// Positions of pulses lying within `[-half_width, half_width]`.
    pub fn within(&self, half_width: f64) -> impl Iterator<Item = f64> + '_ {
        self.pulses
            .iter()
            .filter(move |p| p.position.abs() <= half_width)
            .map(|p| p.position)
    }

    pub fn pulses(&self) -> &[ActionPotential] {
        self.pulses.as_slice()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Removes every pulse.
    pub fn clear(&mut self) {
        self.pulses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_adds_speed_per_frame() {
        let mut tracker = ActionPotentialTracker::new(10.0);
        let id = tracker.spawn(-8.0, 0.040, 1.0);

        for _ in 0..180 {
            tracker.advance();
        }

        assert_relative_eq!(tracker.position(id).unwrap(), -0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_removed_past_travel_bound() {
        let mut tracker = ActionPotentialTracker::new(10.0);
        let id = tracker.spawn(9.95, 0.040, 1.0);

        assert_eq!(tracker.advance(), 0);
        assert!(tracker.position(id).is_some());
        assert!(tracker.pulses().iter().all(|p| p.active));

        assert_eq!(tracker.advance(), 1);
        assert!(tracker.position(id).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_pulses_are_independent() {
        let mut tracker = ActionPotentialTracker::new(10.0);
        let a = tracker.spawn(-8.0, 0.040, 1.0);
        let b = tracker.spawn(0.0, 0.080, 1.0);

        tracker.advance();

        assert_relative_eq!(tracker.position(a).unwrap(), -7.96, epsilon = 1e-12);
        assert_relative_eq!(tracker.position(b).unwrap(), 0.08, epsilon = 1e-12);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_within_window() {
        let mut tracker = ActionPotentialTracker::new(10.0);
        tracker.spawn(-3.0, 0.040, 1.0);
        tracker.spawn(1.0, 0.040, 1.0);

        let inside: Vec<f64> = tracker.within(2.5).collect();
        assert_eq!(inside, vec![1.0]);
    }
}
