use pnp_sequencer_types::{BoardLocationId, PartId};
use std::fmt;

use crate::record::PlacementKey;

/// Recovery actions offered alongside a phase failure
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Mark one placement Skipped so the failing phase can be re-entered
    SkipPlacement { placement: PlacementKey },

    /// Mark every unfinished placement of a part Skipped
    SkipPart { part: PartId },

    /// Clear the board's fiducial-check flag and keep its nominal origin
    SkipFiducialCheck { board: BoardLocationId },

    /// Disable the board and skip all of its unfinished placements
    DisableBoard { board: BoardLocationId },

    /// Abort the run and perform the cleanup routine
    AbortJob,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SkipPlacement { .. } => "Skip Placement",
            Command::SkipPart { .. } => "Skip Part",
            Command::SkipFiducialCheck { .. } => "Skip Fiducial Check",
            Command::DisableBoard { .. } => "Disable Board",
            Command::AbortJob => "Abort Job",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::SkipPlacement { .. } => "Skip the failing placement and continue the job.",
            Command::SkipPart { .. } => {
                "Skip every remaining placement that uses this part and continue the job."
            }
            Command::SkipFiducialCheck { .. } => {
                "Use the nominal board location instead of checking fiducials."
            }
            Command::DisableBoard { .. } => {
                "Disable the board so none of its placements are processed."
            }
            Command::AbortJob => "Abort the job, move to safe Z and discard held parts.",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SkipPlacement { placement } => write!(f, "{} ({placement})", self.name()),
            Command::SkipPart { part } => write!(f, "{} ({part})", self.name()),
            Command::SkipFiducialCheck { board } | Command::DisableBoard { board } => {
                write!(f, "{} ({board})", self.name())
            }
            Command::AbortJob => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        let key = PlacementKey::new("b1", "R1");
        assert_eq!(Command::SkipPlacement { placement: key }.name(), "Skip Placement");
        assert_eq!(Command::SkipPart { part: "P1".into() }.name(), "Skip Part");
        assert_eq!(
            Command::SkipFiducialCheck { board: "b1".into() }.name(),
            "Skip Fiducial Check"
        );
        assert_eq!(Command::DisableBoard { board: "b1".into() }.name(), "Disable Board");
        assert_eq!(Command::AbortJob.name(), "Abort Job");
    }

    #[test]
    fn test_command_display_includes_target() {
        let cmd = Command::SkipPart { part: "R-0603".into() };
        assert_eq!(cmd.to_string(), "Skip Part (R-0603)");
        assert!(!cmd.description().is_empty());
    }
}
