//! Setup validation before any motion

use pnp_sequencer_machine::{Feeder, Nozzle};
use std::sync::Arc;
use tracing::{debug, info};

use crate::command::Command;
use crate::context::{PhaseEnv, RunContext};
use crate::error::{JobError, JobFailure, PartAvailabilityReason, PlacementValidationReason};
use crate::phase::{Phase, PhaseOutcome};
use crate::record::{JobPlacement, PlacementStatus};

pub(crate) async fn run(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    ctx.admit();
    env.status("Checking job for setup errors.");

    let head = env.machine.default_head().map_err(JobError::from)?;
    let nozzles = head.nozzles();
    let feeders = env.machine.feeders();

    let mut checked = 0usize;
    for record in ctx.placements_with_status(PlacementStatus::Pending) {
        env.checkpoint()?;
        check_placement(ctx, record, head.id(), &nozzles, &feeders)?;
        checked += 1;
    }
    debug!(checked, "pre-flight checks passed");

    env.status("Preparing machine.");
    ctx.plan.clear();
    env.call(head.move_to_safe_z()).await?;
    env.call(head.release_all()).await?;

    info!(
        job = %ctx.job.name,
        placements = ctx.placements.len(),
        "job prepared"
    );
    Ok(PhaseOutcome::Advance(Phase::FiducialCheck))
}

fn check_placement(
    ctx: &RunContext,
    record: &JobPlacement,
    head_id: &str,
    nozzles: &[Arc<dyn Nozzle>],
    feeders: &[Arc<dyn Feeder>],
) -> Result<(), JobFailure> {
    let skip_placement = || Command::SkipPlacement {
        placement: record.key().clone(),
    };
    let invalid = |reason| {
        JobFailure::new(
            JobError::PlacementValidation {
                board: record.board().clone(),
                placement: record.placement_id().clone(),
                reason,
            },
            vec![skip_placement()],
        )
    };

    let part = ctx
        .part_of(record)
        .ok_or_else(|| invalid(PlacementValidationReason::MissingPart))?;
    if part.height <= 0.0 {
        return Err(invalid(PlacementValidationReason::NonPositiveHeight {
            part: part.id.clone(),
            height: part.height,
        }));
    }

    let unavailable = |reason| {
        JobFailure::new(
            JobError::PartAvailability {
                part: part.id.clone(),
                reason,
            },
            vec![Command::SkipPart {
                part: part.id.clone(),
            }],
        )
    };

    if !nozzles.iter().any(|n| n.can_handle(part)) {
        return Err(unavailable(PartAvailabilityReason::NoCompatibleNozzleTip {
            head: head_id.to_string(),
        }));
    }
    if !feeders.iter().any(|f| f.is_enabled() && f.can_feed(part)) {
        return Err(unavailable(PartAvailabilityReason::NoCompatibleFeeder));
    }
    Ok(())
}
