//! The five-stage transmission process indicator.
//!
//! ```text
//! Idle(0) -> Depolarizing(1) -> CalciumOpen(2) -> VesicleRelease(3)
//!         -> ReceptorBinding(4) -> PostsynapticResponse(5) -> Idle(0)
//! ```
//!
//! Forward moves are accepted only to the direct successor. Returning to
//! `Idle` is always allowed (cycle reset, halt, pause-restart, reset).

use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stage of the transmission process.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Stage {
    #[default]
    Idle,
    Depolarizing,
    CalciumOpen,
    VesicleRelease,
    ReceptorBinding,
    PostsynapticResponse,
}

impl Stage {
    /// Returns every stage in process order.
    pub fn all() -> [Stage; 6] {
        [
            Stage::Idle,
            Stage::Depolarizing,
            Stage::CalciumOpen,
            Stage::VesicleRelease,
            Stage::ReceptorBinding,
            Stage::PostsynapticResponse,
        ]
    }

    /// Numeric indicator value (0-5).
    pub fn index(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::Depolarizing => 1,
            Stage::CalciumOpen => 2,
            Stage::VesicleRelease => 3,
            Stage::ReceptorBinding => 4,
            Stage::PostsynapticResponse => 5,
        }
    }

    /// Inverse of [`Stage::index`].
    #[cfg(test)]
    pub fn from_index(index: u8) -> Option<Stage> {
        Stage::all().into_iter().find(|s| s.index() == index)
    }

    /// The stage a forward transition from `self` must enter.
    ///
    /// `PostsynapticResponse` has no successor: the cycle resets to `Idle`.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Depolarizing),
            Stage::Depolarizing => Some(Stage::CalciumOpen),
            Stage::CalciumOpen => Some(Stage::VesicleRelease),
            Stage::VesicleRelease => Some(Stage::ReceptorBinding),
            Stage::ReceptorBinding => Some(Stage::PostsynapticResponse),
            Stage::PostsynapticResponse => None,
        }
    }

    /// Returns the stage name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Depolarizing => "depolarizing",
            Stage::CalciumOpen => "calcium_open",
            Stage::VesicleRelease => "vesicle_release",
            Stage::ReceptorBinding => "receptor_binding",
            Stage::PostsynapticResponse => "postsynaptic_response",
        }
    }

    /// Returns the caption shown next to the process indicator.
    pub fn caption(self) -> &'static str {
        match self {
            Stage::Idle => "Resting state",
            Stage::Depolarizing => "Action potential travels down the axon",
            Stage::CalciumOpen => "Voltage-gated calcium channels open",
            Stage::VesicleRelease => "Vesicles fuse and release neurotransmitter",
            Stage::ReceptorBinding => "Neurotransmitter binds postsynaptic receptors",
            Stage::PostsynapticResponse => "Postsynaptic membrane depolarizes",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.index())
    }
}

/// One accepted stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,

    /// Clock time the transition took effect
    pub at: Duration,

    /// Set only on the return to idle that ends a finished cycle
    #[serde(default)]
    pub completes_cycle: bool,
}

impl StageTransition {
    /// True for a forward move to the direct successor or a return to idle.
    pub fn is_ordered(&self) -> bool {
        self.from.next() == Some(self.to) || (self.to == Stage::Idle && self.from != Stage::Idle)
    }
}

/// Current stage plus the history of accepted transitions.
#[derive(Debug, Clone, Default)]
pub struct StageMachine {
    current: Stage,
    history: Vec<StageTransition>,
}

impl StageMachine {
    /// Creates a machine at `Idle` with empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active stage.
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Returns every accepted transition since creation or the last clear.
    pub fn history(&self) -> &[StageTransition] {
        &self.history
    }

    /// Moves forward to `to` if it directly succeeds the current stage.
    pub fn advance(&mut self, to: Stage, at: Duration) -> Result<StageTransition, StageError> {
        if self.current.next() != Some(to) {
            return Err(StageError::Skipped {
                from: self.current,
                to,
            });
        }
        Ok(self.record(to, at, false))
    }

    /// Ends a finished cycle: `PostsynapticResponse -> Idle`.
    pub fn complete_cycle(&mut self, at: Duration) -> Result<StageTransition, StageError> {
        if self.current != Stage::PostsynapticResponse {
            return Err(StageError::Skipped {
                from: self.current,
                to: Stage::Idle,
            });
        }
        Ok(self.record(Stage::Idle, at, true))
    }

    /// Abandons the current cycle and returns to `Idle`. Records nothing
    /// when already idle.
    pub fn return_to_idle(&mut self, at: Duration) -> Option<StageTransition> {
        if self.current == Stage::Idle {
            return None;
        }
        Some(self.record(Stage::Idle, at, false))
    }

    /// Returns to `Idle` and forgets the history.
    pub fn clear(&mut self) {
        self.current = Stage::Idle;
        self.history.clear();
    }

    fn record(&mut self, to: Stage, at: Duration, completes_cycle: bool) -> StageTransition {
        let transition = StageTransition {
            from: self.current,
            to,
            at,
            completes_cycle,
        };
        self.current = to;
        self.history.push(transition);
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(5);

    #[test]
    fn test_index_roundtrip_covers_all() {
        for stage in Stage::all() {
            assert_eq!(Stage::from_index(stage.index()), Some(stage));
        }
        assert_eq!(Stage::from_index(6), None);
    }

    #[test]
    fn test_full_forward_walk() {
        let mut machine = StageMachine::new();
        for stage in &Stage::all()[1..] {
            machine.advance(*stage, T).unwrap();
        }
        assert_eq!(machine.current(), Stage::PostsynapticResponse);
        assert_eq!(machine.history().len(), 5);
        assert!(machine.history().iter().all(StageTransition::is_ordered));
    }

    #[test]
    fn test_skip_is_rejected() {
        let mut machine = StageMachine::new();
        machine.advance(Stage::Depolarizing, T).unwrap();

        let err = machine.advance(Stage::VesicleRelease, T).unwrap_err();
        assert_eq!(
            err,
            StageError::Skipped {
                from: Stage::Depolarizing,
                to: Stage::VesicleRelease
            }
        );
        assert_eq!(machine.current(), Stage::Depolarizing);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn test_repeat_entry_is_rejected() {
        let mut machine = StageMachine::new();
        machine.advance(Stage::Depolarizing, T).unwrap();
        machine.advance(Stage::CalciumOpen, T).unwrap();
        assert!(machine.advance(Stage::CalciumOpen, T).is_err());
    }

    #[test]
    fn test_no_successor_after_response() {
        let mut machine = StageMachine::new();
        for stage in &Stage::all()[1..] {
            machine.advance(*stage, T).unwrap();
        }
        assert!(machine.advance(Stage::Depolarizing, T).is_err());

        let back = machine.complete_cycle(T).unwrap();
        assert_eq!(back.from, Stage::PostsynapticResponse);
        assert!(back.is_ordered());
        assert!(back.completes_cycle);
        machine.advance(Stage::Depolarizing, T).unwrap();
    }

    #[test]
    fn test_complete_cycle_only_from_response() {
        let mut machine = StageMachine::new();
        machine.advance(Stage::Depolarizing, T).unwrap();

        let err = machine.complete_cycle(T).unwrap_err();
        assert_eq!(
            err,
            StageError::Skipped {
                from: Stage::Depolarizing,
                to: Stage::Idle
            }
        );

        let abandoned = machine.return_to_idle(T).unwrap();
        assert!(!abandoned.completes_cycle);
        assert_eq!(machine.history().len(), 2);
    }

    #[test]
    fn test_return_to_idle_when_idle_records_nothing() {
        let mut machine = StageMachine::new();
        assert!(machine.return_to_idle(T).is_none());
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_clear_forgets_history() {
        let mut machine = StageMachine::new();
        machine.advance(Stage::Depolarizing, T).unwrap();
        machine.clear();
        assert_eq!(machine.current(), Stage::Idle);
        assert!(machine.history().is_empty());
    }
}
