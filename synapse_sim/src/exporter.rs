//! JSON exporter for offline playback.
//!
//! Exports controller snapshots so a renderer can replay a run without
//! re-simulating it.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use synapse_core::{Snapshot, StageTransition};

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Recorded frames
    pub frames: Vec<Snapshot>,

    /// Stage history at the end of the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<StageTransition>,

    /// Final results
    pub passed: bool,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            transitions: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: Snapshot) {
        self.duration_sec = frame.time_ms / 1000.0;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(
        &mut self,
        passed: bool,
        failure_reason: Option<String>,
        transitions: &[StageTransition],
    ) {
        self.passed = passed;
        self.failure_reason = failure_reason;
        self.transitions = transitions.to_vec();
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::{SimulationController, SynapseConfig};

    #[test]
    fn test_export_roundtrips_through_file() {
        let sim = SimulationController::from_seed(SynapseConfig::default()).unwrap();
        let mut export = SimExport::new("full_run", 42);
        export.add_frame(Snapshot::capture(&sim));
        export.finalize(true, None, sim.history());

        let path = std::env::temp_dir().join(format!("synapse_export_{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: SimExport = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.scenario, "full_run");
        assert_eq!(back.frames.len(), 1);
        assert!(back.passed);
        assert!(back.failure_reason.is_none());
    }
}
