//! Presentation flags owned by the controller.
//!
//! Camera motion and label drawing belong to the renderer; the core only
//! records what the user asked for.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Named camera framings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraTarget {
    #[default]
    Overview,
    Synapse,
    Axon,
}

/// Eye position and look-at point of a framing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPreset {
    pub eye: Vector3<f64>,
    pub look_at: Vector3<f64>,
}

impl CameraTarget {
    pub fn preset(self) -> CameraPreset {
        let (eye, look_at) = match self {
            CameraTarget::Overview => (Vector3::new(0.0, 5.0, 15.0), Vector3::zeros()),
            CameraTarget::Synapse => (Vector3::new(2.0, 1.0, 8.0), Vector3::new(2.0, 0.0, 0.0)),
            CameraTarget::Axon => (Vector3::new(-5.0, 2.0, 10.0), Vector3::new(-5.0, 0.0, 0.0)),
        };
        CameraPreset { eye, look_at }
    }
}

/// User-facing presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub labels_visible: bool,
    pub camera: CameraTarget,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            labels_visible: true,
            camera: CameraTarget::Overview,
        }
    }
}

impl ViewState {
    /// Flips label visibility. Returns the new value.
    pub fn toggle_labels(&mut self) -> bool {
        self.labels_visible = !self.labels_visible;
        self.labels_visible
    }

    pub fn focus(&mut self, target: CameraTarget) {
        self.camera = target;
    }
}

/// Cubic ease-in-out on `[0, 1]`, for renderers animating between presets.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_toggle_labels() {
        let mut view = ViewState::default();
        assert!(view.labels_visible);
        assert!(!view.toggle_labels());
        assert!(view.toggle_labels());
    }

    #[test]
    fn test_synapse_preset() {
        let preset = CameraTarget::Synapse.preset();
        assert_eq!(preset.eye, Vector3::new(2.0, 1.0, 8.0));
        assert_eq!(preset.look_at.x, 2.0);
    }

    #[test]
    fn test_ease_endpoints_and_midpoint() {
        assert_relative_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_relative_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_relative_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!(ease_in_out_cubic(0.25) < 0.25);
        assert!(ease_in_out_cubic(0.75) > 0.75);
    }
}
