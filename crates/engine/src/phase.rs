use serde::{Deserialize, Serialize};
use std::fmt;

/// Named steps of a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Build placement records and validate parts, nozzle tips and feeders
    PreFlight,

    /// Locate fiducials on enabled boards that request it
    FiducialCheck,

    /// Assign pending placements to nozzles for the next cycle
    Plan,

    Feed,
    Pick,

    /// Measure the held part offset, when an alignment station is fitted
    Align,

    Place,

    /// End of cycle; loops back to Plan
    Cleanup,

    /// Terminal phase; returns the engine to idle
    Finish,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::PreFlight => "PreFlight",
            Phase::FiducialCheck => "FiducialCheck",
            Phase::Plan => "Plan",
            Phase::Feed => "Feed",
            Phase::Pick => "Pick",
            Phase::Align => "Align",
            Phase::Place => "Place",
            Phase::Cleanup => "Cleanup",
            Phase::Finish => "Finish",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::PreFlight => "Check the job for setup errors and prepare the machine",
            Phase::FiducialCheck => "Locate board fiducials",
            Phase::Plan => "Plan the next placement cycle",
            Phase::Feed => "Feed parts for the planned placements",
            Phase::Pick => "Pick fed parts",
            Phase::Align => "Align picked parts",
            Phase::Place => "Place aligned parts",
            Phase::Cleanup => "Finish the placement cycle",
            Phase::Finish => "Finish the job",
        }
    }

    /// Phases making up one placement cycle, after Plan
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            Phase::Feed | Phase::Pick | Phase::Align | Phase::Place | Phase::Cleanup
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one successful phase execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Move the phase pointer
    Advance(Phase),

    /// Leave the phase pointer unchanged; the phase runs again on the next step
    Retry,

    /// The job is finished; the engine becomes idle
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_phases() {
        assert!(Phase::Feed.is_execution());
        assert!(Phase::Cleanup.is_execution());
        assert!(!Phase::Plan.is_execution());
        assert!(!Phase::Finish.is_execution());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::FiducialCheck.to_string(), "FiducialCheck");
        assert_eq!(
            serde_json::to_string(&Phase::PreFlight).unwrap(),
            "\"PreFlight\""
        );
    }
}
