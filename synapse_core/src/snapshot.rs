//! Read-only frame snapshot for renderers and exporters.

use crate::controller::SimulationController;
use crate::effects::EffectKind;
use crate::entities::{ActionPotential, EntityId, IonChannel, Neurotransmitter, Receptor, Vesicle};
use crate::stage::Stage;
use crate::view::ViewState;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An effect with its progress resolved at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectFrame {
    pub id: EntityId,
    pub kind: EffectKind,
    pub progress: f64,
}

/// Everything a renderer reads for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Clock time in milliseconds
    pub time_ms: f64,

    pub stage: Stage,
    pub stage_index: u8,
    pub caption: String,
    pub loop_count: u32,
    pub max_loops: u32,
    pub is_playing: bool,

    pub channels: Vec<IonChannel>,
    pub vesicles: Vec<Vesicle>,
    pub receptors: Vec<Receptor>,
    pub transmitters: Vec<Neurotransmitter>,
    pub action_potentials: Vec<ActionPotential>,
    pub effects: Vec<EffectFrame>,
    pub view: ViewState,
}

impl Snapshot {
    /// Captures the controller's current state.
    pub fn capture<R: Rng>(sim: &SimulationController<R>) -> Self {
        let now = sim.now();
        let stage = sim.stage();

        Self {
            time_ms: now.as_secs_f64() * 1000.0,
            stage,
            stage_index: stage.index(),
            caption: stage.caption().to_string(),
            loop_count: sim.loop_count(),
            max_loops: sim.config().max_loops,
            is_playing: sim.is_playing(),
            channels: sim.channels().to_vec(),
            vesicles: sim.vesicles().to_vec(),
            receptors: sim.receptors().to_vec(),
            transmitters: sim.transmitters().to_vec(),
            action_potentials: sim.action_potentials().to_vec(),
            effects: sim
                .effects()
                .iter()
                .map(|e| EffectFrame {
                    id: e.id,
                    kind: e.kind,
                    progress: e.progress(now),
                })
                .collect(),
            view: sim.view(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynapseConfig;
    use std::time::Duration;

    #[test]
    fn test_snapshot_reflects_controller() {
        let mut sim = SimulationController::from_seed(SynapseConfig::default()).unwrap();
        sim.start();
        sim.frame(Duration::from_millis(16));

        let snapshot = Snapshot::capture(&sim);
        assert_eq!(snapshot.stage, Stage::Depolarizing);
        assert_eq!(snapshot.stage_index, 1);
        assert_eq!(snapshot.channels.len(), 18);
        assert_eq!(snapshot.action_potentials.len(), 1);
        assert!(snapshot.is_playing);
        assert!((snapshot.time_ms - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_serializes() {
        let sim = SimulationController::from_seed(SynapseConfig::default()).unwrap();
        let json = serde_json::to_value(Snapshot::capture(&sim)).unwrap();

        assert_eq!(json["stage"], "Idle");
        assert_eq!(json["vesicles"].as_array().unwrap().len(), 20);
        assert_eq!(json["view"]["labels_visible"], true);
    }
}
