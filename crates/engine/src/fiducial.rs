use pnp_sequencer_machine::MachineError;
use pnp_sequencer_types::BoardLocationId;
use tracing::info;

use crate::command::Command;
use crate::context::{PhaseEnv, RunContext};
use crate::error::{JobError, JobFailure};
use crate::phase::{Phase, PhaseOutcome};

/// Locate every enabled board that asks for a fiducial check and has no result yet
pub(crate) async fn run(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    let outstanding: Vec<BoardLocationId> = ctx
        .job
        .enabled_boards()
        .filter(|bl| bl.check_fiducials && !ctx.fiducial_overrides.contains_key(&bl.id))
        .map(|bl| bl.id.clone())
        .collect();

    if outstanding.is_empty() {
        return Ok(PhaseOutcome::Advance(Phase::Plan));
    }
    env.status("Checking fiducials.");

    for board in outstanding {
        env.checkpoint()?;

        let failed = |source| {
            JobFailure::new(
                JobError::Fiducial {
                    board: board.clone(),
                    source,
                },
                vec![
                    Command::SkipFiducialCheck {
                        board: board.clone(),
                    },
                    Command::DisableBoard {
                        board: board.clone(),
                    },
                ],
            )
        };

        let Some(locator) = env.machine.fiducial_locator() else {
            return Err(failed(MachineError::Vision(
                "no fiducial locator configured".to_string(),
            )));
        };
        let Some(bl) = ctx.job.board_location(&board) else {
            return Err(JobError::invalid_state(format!("board {board} not in job")).into());
        };

        let located = match env.call(locator.locate_board(bl)).await {
            Ok(location) => location,
            Err(JobError::HardwareOperation(source)) => return Err(failed(source)),
            Err(other) => return Err(other.into()),
        };

        info!(
            board = %board,
            fiducials = bl.board.fiducials().count(),
            x = located.x,
            y = located.y,
            rotation = located.rotation,
            "board located"
        );
        env.status(&format!("Fiducial check for {board} complete."));
        ctx.fiducial_overrides.insert(board, located);
    }

    Ok(PhaseOutcome::Advance(Phase::Plan))
}
