//! Control-surface scenarios for deterministic runs.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SYN-001: Start once and let every cycle run to the loop limit
    FullRun,

    /// SYN-002: Verify pulse threshold crossing frames
    ThresholdTiming,

    /// SYN-003: Pause with a transition pending, then resume
    PauseResume,

    /// SYN-004: Reset in the middle of a cycle
    ResetMidCycle,

    /// SYN-005: Toggle start/pause every few frames
    RapidToggle,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullRun,
            ScenarioId::ThresholdTiming,
            ScenarioId::PauseResume,
            ScenarioId::ResetMidCycle,
            ScenarioId::RapidToggle,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullRun => "full_run",
            ScenarioId::ThresholdTiming => "threshold_timing",
            ScenarioId::PauseResume => "pause_resume",
            ScenarioId::ResetMidCycle => "reset_mid_cycle",
            ScenarioId::RapidToggle => "rapid_toggle",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullRun => "Run every cycle to the loop limit, verify ordering and halt",
            ScenarioId::ThresholdTiming => {
                "Calcium and release fire on the exact pulse crossing frames"
            }
            ScenarioId::PauseResume => {
                "Pause with a transition pending; stale timer must not advance the stage"
            }
            ScenarioId::ResetMidCycle => {
                "Reset during vesicle release; everything returns to its initial state"
            }
            ScenarioId::RapidToggle => "Toggle playback every 7 frames, then run to completion",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_run" | "fullrun" | "syn-001" => Ok(ScenarioId::FullRun),
            "threshold_timing" | "thresholdtiming" | "syn-002" => Ok(ScenarioId::ThresholdTiming),
            "pause_resume" | "pauseresume" | "syn-003" => Ok(ScenarioId::PauseResume),
            "reset_mid_cycle" | "resetmidcycle" | "syn-004" => Ok(ScenarioId::ResetMidCycle),
            "rapid_toggle" | "rapidtoggle" | "syn-005" => Ok(ScenarioId::RapidToggle),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
