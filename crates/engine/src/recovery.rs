//! Execution of caller-chosen recovery commands against the run state

use tracing::info;

use crate::command::Command;
use crate::context::RunContext;
use crate::error::JobError;
use crate::phase::Phase;
use crate::record::PlacementStatus;

/// What a recovery command changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RecoveryResult {
    pub skipped: u64,
}

/// Apply a skip or disable command. Abort is handled by the engine.
pub(crate) fn apply(
    ctx: &mut RunContext,
    phase: Phase,
    command: &Command,
) -> Result<RecoveryResult, JobError> {
    check_applicable(phase, command)?;

    let result = match command {
        Command::SkipPlacement { placement } => {
            let record = ctx
                .placements
                .iter_mut()
                .find(|r| r.key() == placement)
                .ok_or_else(|| JobError::misuse(format!("unknown placement {placement}")))?;
            match record.status() {
                PlacementStatus::Skipped => RecoveryResult::default(),
                PlacementStatus::Placed => {
                    return Err(JobError::misuse(format!(
                        "placement {placement} has already been placed"
                    )))
                }
                _ => {
                    record.advance(PlacementStatus::Skipped)?;
                    RecoveryResult { skipped: 1 }
                }
            }
        }
        Command::SkipPart { part } => {
            let mut matched = false;
            let mut skipped = 0;
            for record in ctx
                .placements
                .iter_mut()
                .filter(|r| r.part_id() == Some(part))
            {
                matched = true;
                if !record.status().is_terminal() {
                    record.advance(PlacementStatus::Skipped)?;
                    skipped += 1;
                }
            }
            if !matched {
                return Err(JobError::misuse(format!("part {part} is not used by this job")));
            }
            RecoveryResult { skipped }
        }
        Command::SkipFiducialCheck { board } => {
            let bl = ctx
                .job
                .board_location_mut(board)
                .ok_or_else(|| JobError::misuse(format!("unknown board {board}")))?;
            bl.check_fiducials = false;
            RecoveryResult::default()
        }
        Command::DisableBoard { board } => {
            let bl = ctx
                .job
                .board_location_mut(board)
                .ok_or_else(|| JobError::misuse(format!("unknown board {board}")))?;
            bl.enabled = false;

            let mut skipped = 0;
            for record in ctx
                .placements
                .iter_mut()
                .filter(|r| r.board() == board && !r.status().is_terminal())
            {
                record.advance(PlacementStatus::Skipped)?;
                skipped += 1;
            }
            RecoveryResult { skipped }
        }
        Command::AbortJob => RecoveryResult::default(),
    };

    info!(
        command = %command,
        phase = %phase,
        skipped = result.skipped,
        "recovery command executed"
    );
    Ok(result)
}

/// Skips only run where no plan entry is live; board commands only during the fiducial check
fn check_applicable(phase: Phase, command: &Command) -> Result<(), JobError> {
    let allowed = match command {
        // No cycle plan entry is live outside the execution chain
        Command::SkipPlacement { .. } | Command::SkipPart { .. } => {
            !phase.is_execution() && phase != Phase::Finish
        }
        Command::SkipFiducialCheck { .. } | Command::DisableBoard { .. } => {
            phase == Phase::FiducialCheck
        }
        Command::AbortJob => true,
    };
    if !allowed {
        return Err(JobError::misuse(format!(
            "{} is not applicable in phase {phase}",
            command.name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnp_sequencer_types::{Board, BoardLocation, Job, Location, Part, Placement};

    fn context() -> RunContext {
        let part = Part::new("P1", 1.0);
        let board = Board::new("panel")
            .with_placement(Placement::new("R1", Some(part.clone()), Location::xy(1.0, 1.0)))
            .with_placement(Placement::new("R2", Some(part), Location::xy(2.0, 1.0)))
            .with_placement(Placement::new(
                "C1",
                Some(Part::new("P2", 0.5)),
                Location::xy(3.0, 1.0),
            ));
        let job = Job::new("job")
            .with_board(BoardLocation::new("b1", board.clone(), Location::default()))
            .with_board(
                BoardLocation::new("b2", board, Location::xy(50.0, 0.0)).with_fiducial_check(true),
            );

        let mut ctx = RunContext::new(job);
        ctx.admit();
        ctx
    }

    #[test]
    fn test_skip_placement_is_idempotent() {
        let mut ctx = context();
        let cmd = Command::SkipPlacement {
            placement: crate::PlacementKey::new("b1", "R1"),
        };

        assert_eq!(apply(&mut ctx, Phase::PreFlight, &cmd).unwrap().skipped, 1);
        assert_eq!(apply(&mut ctx, Phase::PreFlight, &cmd).unwrap().skipped, 0);
        assert_eq!(ctx.summary().skipped, 1);
    }

    #[test]
    fn test_skip_placed_is_misuse() {
        let mut ctx = context();
        let key = crate::PlacementKey::new("b1", "R1");
        ctx.placements[0].advance(PlacementStatus::Processing).unwrap();
        ctx.placements[0].advance(PlacementStatus::Placed).unwrap();

        let result = apply(&mut ctx, Phase::Plan, &Command::SkipPlacement { placement: key });
        assert!(matches!(result, Err(JobError::ProtocolMisuse { .. })));
        assert_eq!(ctx.placements[0].status(), PlacementStatus::Placed);
    }

    #[test]
    fn test_skip_part_across_boards() {
        let mut ctx = context();
        let result = apply(&mut ctx, Phase::Plan, &Command::SkipPart { part: "P1".into() }).unwrap();

        assert_eq!(result.skipped, 4);
        let pending: Vec<_> = ctx
            .placements_with_status(PlacementStatus::Pending)
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(pending, vec!["b1/C1", "b2/C1"]);
    }

    #[test]
    fn test_skip_unknown_part_is_misuse() {
        let mut ctx = context();
        let result = apply(&mut ctx, Phase::Plan, &Command::SkipPart { part: "nope".into() });
        assert!(matches!(result, Err(JobError::ProtocolMisuse { .. })));
    }

    #[test]
    fn test_disable_board_skips_its_records() {
        let mut ctx = context();
        let cmd = Command::DisableBoard { board: "b2".into() };

        assert_eq!(apply(&mut ctx, Phase::FiducialCheck, &cmd).unwrap().skipped, 3);
        assert!(!ctx.job.board_location(&"b2".into()).unwrap().enabled);
        assert_eq!(ctx.summary().pending, 3);
    }

    #[test]
    fn test_skip_fiducial_check_clears_flag() {
        let mut ctx = context();
        let cmd = Command::SkipFiducialCheck { board: "b2".into() };

        apply(&mut ctx, Phase::FiducialCheck, &cmd).unwrap();
        assert!(!ctx.job.board_location(&"b2".into()).unwrap().check_fiducials);
        assert_eq!(ctx.summary().skipped, 0);
    }

    #[test]
    fn test_commands_rejected_outside_their_phases() {
        let mut ctx = context();
        let skip = Command::SkipPart { part: "P1".into() };
        let disable = Command::DisableBoard { board: "b1".into() };

        assert!(apply(&mut ctx, Phase::Pick, &skip).is_err());
        assert!(apply(&mut ctx, Phase::Plan, &disable).is_err());
        assert_eq!(ctx.summary().skipped, 0);
        assert!(ctx.job.board_location(&"b1".into()).unwrap().enabled);
    }
}
