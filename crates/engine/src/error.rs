use pnp_sequencer_machine::MachineError;
use pnp_sequencer_types::{BoardLocationId, PartId, PlacementId};
use thiserror::Error;

use crate::command::Command;

/// Why a single placement cannot be placed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementValidationReason {
    #[error("part not found in the part library")]
    MissingPart,

    #[error("part height for {part} must be greater than 0, got {height}")]
    NonPositiveHeight { part: PartId, height: f64 },
}

/// Why no placement of a part can be placed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartAvailabilityReason {
    #[error("no nozzle tip on head {head} can handle it")]
    NoCompatibleNozzleTip { head: String },

    #[error("no enabled feeder supplies it")]
    NoCompatibleFeeder,
}

/// Job execution errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("placement {placement} on board {board}: {reason}")]
    PlacementValidation {
        board: BoardLocationId,
        placement: PlacementId,
        reason: PlacementValidationReason,
    },

    #[error("part {part} unavailable: {reason}")]
    PartAvailability {
        part: PartId,
        reason: PartAvailabilityReason,
    },

    #[error("fiducial check failed for board {board}: {source}")]
    Fiducial {
        board: BoardLocationId,
        #[source]
        source: MachineError,
    },

    #[error("hardware operation failed: {0}")]
    HardwareOperation(#[from] MachineError),

    #[error("protocol misuse: {reason}")]
    ProtocolMisuse { reason: String },

    #[error("engine state inconsistent: {reason}")]
    InvalidState { reason: String },

    #[error("job aborted")]
    Aborted,
}

impl JobError {
    pub(crate) fn misuse(reason: impl Into<String>) -> Self {
        JobError::ProtocolMisuse {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        JobError::InvalidState {
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::PlacementValidation { .. } => "placement_validation",
            JobError::PartAvailability { .. } => "part_availability",
            JobError::Fiducial { .. } => "fiducial",
            JobError::HardwareOperation(_) => "hardware_operation",
            JobError::ProtocolMisuse { .. } => "protocol_misuse",
            JobError::InvalidState { .. } => "invalid_state",
            JobError::Aborted => "aborted",
        }
    }

    /// Whether the failure was built with recovery actions attached
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            JobError::PlacementValidation { .. }
                | JobError::PartAvailability { .. }
                | JobError::Fiducial { .. }
        )
    }
}

/// A phase failure together with the recovery actions the caller may choose from
#[derive(Debug, Error)]
#[error("{error}")]
pub struct JobFailure {
    pub error: JobError,
    pub actions: Vec<Command>,
}

impl JobFailure {
    pub fn new(error: JobError, actions: Vec<Command>) -> Self {
        Self { error, actions }
    }

    /// First attached action with the given name
    pub fn action(&self, name: &str) -> Option<&Command> {
        self.actions.iter().find(|c| c.name() == name)
    }
}

impl From<JobError> for JobFailure {
    fn from(error: JobError) -> Self {
        Self {
            error,
            actions: Vec::new(),
        }
    }
}

impl From<MachineError> for JobFailure {
    fn from(error: MachineError) -> Self {
        JobError::from(error).into()
    }
}
