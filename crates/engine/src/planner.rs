//! Cycle planning: pairing pending placements with nozzles

use pnp_sequencer_machine::{Feeder, Nozzle};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{PhaseEnv, RunContext};
use crate::error::{JobError, JobFailure};
use crate::phase::{Phase, PhaseOutcome};
use crate::plan::PlannedPlacement;
use crate::record::PlacementStatus;

pub(crate) async fn run(
    ctx: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    if !ctx.has_pending() {
        return Ok(PhaseOutcome::Advance(Phase::Finish));
    }
    env.checkpoint()?;
    env.status("Planning placements.");

    let head = env.machine.default_head().map_err(JobError::from)?;
    let nozzles = head.nozzles();
    let feeders = env.machine.feeders();
    let limit = env
        .config
        .max_cycle_size
        .map_or(nozzles.len(), |max| max.max(1).min(nozzles.len()));

    let plan = plan_cycle(ctx, &nozzles, &feeders, limit);
    if plan.is_empty() {
        warn!(
            pending = ctx.placements_with_status(PlacementStatus::Pending).count(),
            "no pending placement can be planned"
        );
        env.status("Waiting for an available feeder.");
        return Ok(PhaseOutcome::Retry);
    }

    for entry in &plan {
        ctx.placements[entry.record_index()].advance(PlacementStatus::Processing)?;
    }
    info!(
        cycle_size = plan.len(),
        nozzles = nozzles.len(),
        "cycle planned"
    );
    if let Some(metrics) = env.metrics {
        metrics.record_cycle_planned(plan.len());
    }
    ctx.plan = plan;

    Ok(PhaseOutcome::Advance(Phase::Feed))
}

/// Pair pending records, in admission order, with the first free nozzle able to
/// handle their part. A record whose part has no free, available feeder this
/// cycle stays pending.
pub(crate) fn plan_cycle(
    ctx: &RunContext,
    nozzles: &[Arc<dyn Nozzle>],
    feeders: &[Arc<dyn Feeder>],
    limit: usize,
) -> Vec<PlannedPlacement> {
    let mut plan = Vec::new();
    let mut nozzle_used = vec![false; nozzles.len()];
    let mut feeder_claimed = vec![false; feeders.len()];

    for (index, record) in ctx.placements.iter().enumerate() {
        if plan.len() >= limit {
            break;
        }
        if record.status() != PlacementStatus::Pending {
            continue;
        }
        let Some(part) = ctx.part_of(record) else {
            continue;
        };

        let Some(feeder) = (0..feeders.len()).find(|&i| {
            let f = &feeders[i];
            !feeder_claimed[i] && f.is_enabled() && f.can_feed(part) && f.is_available()
        }) else {
            debug!(placement = %record.key(), part = %part.id, "no available feeder this cycle");
            continue;
        };
        let Some(nozzle) = (0..nozzles.len()).find(|&i| !nozzle_used[i] && nozzles[i].can_handle(part))
        else {
            continue;
        };

        nozzle_used[nozzle] = true;
        feeder_claimed[feeder] = true;
        plan.push(PlannedPlacement::new(nozzles[nozzle].clone(), index));
    }

    plan
}
