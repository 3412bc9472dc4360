//! Feed, pick, align and place steps of a cycle, plus cycle and job wrap-up.
//!
//! Each step walks the plan in order and marks entries as it completes them,
//! so a step that fails part-way resumes with the first unfinished entry.

use pnp_sequencer_machine::Feeder;
use pnp_sequencer_types::{Location, Part};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{PhaseEnv, RunContext};
use crate::error::{JobError, JobFailure};
use crate::phase::{Phase, PhaseOutcome};
use crate::plan::reset_steps;
use crate::record::PlacementStatus;

pub(crate) async fn feed(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    let feeders = env.machine.feeders();
    let mut waiting = 0usize;

    for i in 0..ctx.plan.len() {
        if ctx.plan[i].fed {
            continue;
        }
        env.checkpoint()?;
        let part = ctx.planned_part(i)?;

        let feeder = match ctx.plan[i].feeder.clone() {
            Some(feeder) => feeder,
            None => {
                let taken: Vec<String> = ctx
                    .plan
                    .iter()
                    .filter_map(|e| e.feeder.as_ref().map(|f| f.id().to_string()))
                    .collect();
                let Some(feeder) = select_feeder(&feeders, &part, &taken) else {
                    debug!(part = %part.id, "no feeder available, waiting");
                    waiting += 1;
                    continue;
                };
                ctx.plan[i].feeder = Some(feeder.clone());
                feeder
            }
        };

        let nozzle = ctx.plan[i].nozzle().clone();
        env.status(&format!("Feeding {} from {}.", part.id, feeder.id()));
        env.call(feeder.feed(nozzle.as_ref())).await?;
        ctx.plan[i].fed = true;
    }

    if waiting > 0 {
        warn!(waiting, "placements waiting for a feeder");
        return Ok(PhaseOutcome::Retry);
    }
    reset_steps(&mut ctx.plan);
    Ok(PhaseOutcome::Advance(Phase::Pick))
}

fn select_feeder(
    feeders: &[Arc<dyn Feeder>],
    part: &Part,
    taken: &[String],
) -> Option<Arc<dyn Feeder>> {
    feeders
        .iter()
        .find(|f| {
            f.is_enabled()
                && f.can_feed(part)
                && f.is_available()
                && !taken.iter().any(|id| id == f.id())
        })
        .cloned()
}

pub(crate) async fn pick(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    for i in 0..ctx.plan.len() {
        if ctx.plan[i].step_complete {
            continue;
        }
        env.checkpoint()?;
        let part = ctx.planned_part(i)?;
        let nozzle = ctx.plan[i].nozzle().clone();
        let feeder = ctx.plan[i]
            .feeder
            .clone()
            .ok_or_else(|| JobError::invalid_state(format!("plan entry {i} was never fed")))?;

        env.status(&format!("Picking {} with {}.", part.id, nozzle.id()));
        let location = env.call(feeder.pick_location()).await?;
        env.call(nozzle.pick(&part, location)).await?;
        ctx.plan[i].step_complete = true;
    }

    reset_steps(&mut ctx.plan);
    Ok(PhaseOutcome::Advance(Phase::Align))
}

pub(crate) async fn align(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    let alignment = env.machine.part_alignment();

    for i in 0..ctx.plan.len() {
        if ctx.plan[i].step_complete {
            continue;
        }
        env.checkpoint()?;

        ctx.plan[i].alignment_offset = match &alignment {
            Some(alignment) => {
                let part = ctx.planned_part(i)?;
                let nozzle = ctx.plan[i].nozzle().clone();
                env.status(&format!("Aligning {}.", part.id));
                let offset = env.call(alignment.find_offset(&part, nozzle.as_ref())).await?;
                debug!(part = %part.id, x = offset.x, y = offset.y, rotation = offset.rotation, "part aligned");
                Some(offset)
            }
            None => None,
        };
        ctx.plan[i].step_complete = true;
    }

    reset_steps(&mut ctx.plan);
    Ok(PhaseOutcome::Advance(Phase::Place))
}

pub(crate) async fn place(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    for i in 0..ctx.plan.len() {
        if ctx.plan[i].step_complete {
            continue;
        }
        env.checkpoint()?;
        let part = ctx.planned_part(i)?;
        let nozzle = ctx.plan[i].nozzle().clone();
        let record = ctx.plan[i].record_index();
        let target = placement_target(ctx, i, part.height)?;

        env.status(&format!("Placing {} at {}.", part.id, ctx.placements[record].key()));
        env.call(nozzle.place(&part, target)).await?;

        ctx.placements[record].advance(PlacementStatus::Placed)?;
        ctx.total_parts_placed += 1;
        ctx.plan[i].step_complete = true;
        if let Some(metrics) = env.metrics {
            metrics.record_placement_placed();
        }
        info!(
            placement = %ctx.placements[record].key(),
            nozzle = %nozzle.id(),
            x = target.x,
            y = target.y,
            rotation = target.rotation,
            "placement placed"
        );
    }

    reset_steps(&mut ctx.plan);
    Ok(PhaseOutcome::Advance(Phase::Cleanup))
}

/// Machine location for a plan entry: the board placement, corrected by the
/// fiducial result and the alignment offset, raised by the part height.
fn placement_target(ctx: &RunContext, entry: usize, part_height: f64) -> Result<Location, JobError> {
    let planned = &ctx.plan[entry];
    let record = &ctx.placements[planned.record_index()];
    let (Some(bl), Some(placement)) = (ctx.board_of(record), ctx.placement_of(record)) else {
        return Err(JobError::invalid_state(format!(
            "placement {} missing from job",
            record.key()
        )));
    };

    let mut target = bl.placement_location(placement, ctx.fiducial_overrides.get(&bl.id));
    if let Some(offset) = planned.alignment_offset() {
        target = target.subtract_with_rotation(offset.as_location());
    }
    Ok(target.with_z(target.z + part_height))
}

pub(crate) async fn cleanup(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    if env.config.safe_z_between_cycles {
        let head = env.machine.default_head().map_err(JobError::from)?;
        env.call(head.move_to_safe_z()).await?;
    }
    debug!(cycle_size = ctx.plan.len(), "cycle complete");
    ctx.plan.clear();
    Ok(PhaseOutcome::Advance(Phase::Plan))
}

pub(crate) async fn finish(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    let head = env.machine.default_head().map_err(JobError::from)?;
    env.call(head.move_to_safe_z()).await?;
    if env.config.park_when_complete {
        env.call(head.park()).await?;
    }

    let summary = ctx.summary();
    let elapsed = ctx
        .started_at
        .map(|start| (chrono::Utc::now() - start).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();
    info!(
        job = %ctx.job.name,
        placed = summary.placed,
        skipped = summary.skipped,
        elapsed_secs = elapsed,
        "job finished"
    );
    env.status(&format!(
        "Job complete. {} parts placed in {:.1}s.",
        ctx.total_parts_placed, elapsed
    ));
    Ok(PhaseOutcome::Complete)
}
