//! Ground truth auditor for simulation runs.
//!
//! The oracle never drives the controller; it only reads what the
//! controller exposes and reports invariant violations:
//! - Stage history only moves to the direct successor or back to idle
//! - The stage machine never had to refuse a transition
//! - No expired neurotransmitter survives a playing frame
//! - Vesicle release times exist exactly for released vesicles

use rand::Rng;
use std::time::Duration;
use synapse_core::{SimulationController, Stage, StageTransition};

/// Summary of a stage history audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Transitions examined
    pub transitions: usize,

    /// Cycles that reached `PostsynapticResponse` and returned to idle
    pub completed_cycles: usize,

    /// Human-readable invariant violations
    pub violations: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Audits controller state frame by frame and at the end of a run.
#[derive(Debug, Default)]
pub struct TransmissionOracle {
    frame_violations: Vec<String>,
}

impl TransmissionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks per-frame invariants after `sim.frame()` returned.
    pub fn observe<R: Rng>(&mut self, sim: &SimulationController<R>) {
        let now = sim.now();

        if sim.is_playing() {
            if let Some(nt) = sim.transmitters().iter().find(|nt| nt.is_expired(now)) {
                self.frame_violations.push(format!(
                    "neurotransmitter {} alive at age {}ms",
                    nt.id,
                    nt.age(now).as_millis()
                ));
            }
        }

        if let Some(v) = sim
            .vesicles()
            .iter()
            .find(|v| v.release_time.is_some_and(|t| t > now))
        {
            self.frame_violations
                .push(format!("vesicle {} released in the future", v.id));
        }
    }

    /// Audits the full stage history and controller counters.
    pub fn audit<R: Rng>(&self, sim: &SimulationController<R>) -> AuditReport {
        let mut report = audit_history(sim.history());

        if sim.stats().rejected_transitions > 0 {
            report.violations.push(format!(
                "{} stage entries rejected",
                sim.stats().rejected_transitions
            ));
        }
        report.violations.extend(self.frame_violations.iter().cloned());
        report
    }
}

/// Checks ordering and timestamps of a stage history.
pub fn audit_history(history: &[StageTransition]) -> AuditReport {
    let mut report = AuditReport {
        transitions: history.len(),
        ..Default::default()
    };
    let mut last_at = Duration::ZERO;

    for (i, transition) in history.iter().enumerate() {
        if !transition.is_ordered() {
            report.violations.push(format!(
                "transition #{} skipped: {} -> {}",
                i, transition.from, transition.to
            ));
        }
        if transition.at < last_at {
            report
                .violations
                .push(format!("transition #{} goes back in time", i));
        }
        if transition.completes_cycle {
            if transition.from == Stage::PostsynapticResponse && transition.to == Stage::Idle {
                report.completed_cycles += 1;
            } else {
                report.violations.push(format!(
                    "transition #{} completes a cycle from {}",
                    i, transition.from
                ));
            }
        }
        last_at = transition.at;
    }

    if let Some(pair) = history.windows(2).find(|w| w[0].to != w[1].from) {
        report.violations.push(format!(
            "history discontinuity: {} then {} -> {}",
            pair[0].to, pair[1].from, pair[1].to
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::SynapseConfig;

    fn t(from: Stage, to: Stage, ms: u64) -> StageTransition {
        StageTransition {
            from,
            to,
            at: Duration::from_millis(ms),
            completes_cycle: false,
        }
    }

    /// The return to idle that ends a finished cycle.
    fn completed(ms: u64) -> StageTransition {
        StageTransition {
            completes_cycle: true,
            ..t(Stage::PostsynapticResponse, Stage::Idle, ms)
        }
    }

    #[test]
    fn test_clean_cycle() {
        let history = vec![
            t(Stage::Idle, Stage::Depolarizing, 0),
            t(Stage::Depolarizing, Stage::CalciumOpen, 10),
            t(Stage::CalciumOpen, Stage::VesicleRelease, 20),
            t(Stage::VesicleRelease, Stage::ReceptorBinding, 30),
            t(Stage::ReceptorBinding, Stage::PostsynapticResponse, 40),
            completed(50),
        ];
        let report = audit_history(&history);

        assert!(report.is_clean());
        assert_eq!(report.completed_cycles, 1);
        assert_eq!(report.transitions, 6);
    }

    #[test]
    fn test_skip_detected() {
        let history = vec![
            t(Stage::Idle, Stage::Depolarizing, 0),
            t(Stage::Depolarizing, Stage::VesicleRelease, 10),
        ];
        assert!(!audit_history(&history).is_clean());
    }

    #[test]
    fn test_time_reversal_detected() {
        let history = vec![
            t(Stage::Idle, Stage::Depolarizing, 50),
            t(Stage::Depolarizing, Stage::CalciumOpen, 10),
        ];
        assert!(!audit_history(&history).is_clean());
    }

    #[test]
    fn test_discontinuity_detected() {
        let history = vec![
            t(Stage::Idle, Stage::Depolarizing, 0),
            t(Stage::CalciumOpen, Stage::VesicleRelease, 10),
        ];
        assert!(!audit_history(&history).is_clean());
    }

    #[test]
    fn test_aborted_cycle_not_counted() {
        let history = vec![
            t(Stage::Idle, Stage::Depolarizing, 0),
            t(Stage::Depolarizing, Stage::Idle, 10),
        ];
        let report = audit_history(&history);
        assert!(report.is_clean());
        assert_eq!(report.completed_cycles, 0);
    }

    #[test]
    fn test_abandoned_response_not_counted() {
        let history = vec![
            t(Stage::ReceptorBinding, Stage::PostsynapticResponse, 0),
            t(Stage::PostsynapticResponse, Stage::Idle, 10),
            t(Stage::Idle, Stage::Depolarizing, 10),
        ];
        let report = audit_history(&history);
        assert!(report.is_clean());
        assert_eq!(report.completed_cycles, 0);
    }

    #[test]
    fn test_completion_outside_response_detected() {
        let history = vec![
            t(Stage::Idle, Stage::Depolarizing, 0),
            StageTransition {
                completes_cycle: true,
                ..t(Stage::Depolarizing, Stage::Idle, 10)
            },
        ];
        let report = audit_history(&history);
        assert!(!report.is_clean());
        assert_eq!(report.completed_cycles, 0);
    }

    #[test]
    fn test_restart_from_response_agrees_with_stats() {
        let config = SynapseConfig {
            release_probability: 1.0,
            ..Default::default()
        };
        let mut sim = SimulationController::from_seed(config).unwrap();
        let mut oracle = TransmissionOracle::new();
        sim.start();

        let mut frame = 0u64;
        while sim.stage() != Stage::PostsynapticResponse && frame < 2000 {
            frame += 1;
            sim.frame(Duration::from_nanos(frame * 16_666_667));
            oracle.observe(&sim);
        }
        assert_eq!(sim.stage(), Stage::PostsynapticResponse);

        sim.pause();
        sim.start();

        let report = oracle.audit(&sim);
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.completed_cycles, 0);
        assert_eq!(sim.stats().cycles_completed, 0);
        assert_eq!(sim.stage(), Stage::Depolarizing);
    }
}
