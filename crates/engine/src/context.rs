//! Run-scoped state shared by every phase

use chrono::{DateTime, Utc};
use pnp_sequencer_config::EngineConfig;
use pnp_sequencer_machine::{Machine, MachineError};
use pnp_sequencer_metrics::MetricsCollector;
use pnp_sequencer_types::{BoardLocation, BoardLocationId, Job, Location, Part, Placement, PlacementType};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::plan::PlannedPlacement;
use crate::record::{JobPlacement, PlacementKey, PlacementStatus};
use crate::status::StatusChannel;

/// Everything one job run owns: the job, its records, the cycle plan and fiducial results
#[derive(Debug)]
pub struct RunContext {
    pub(crate) job: Job,
    pub(crate) placements: Vec<JobPlacement>,
    pub(crate) admitted: bool,
    pub(crate) plan: Vec<PlannedPlacement>,
    pub(crate) fiducial_overrides: HashMap<BoardLocationId, Location>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) total_parts_placed: u64,
}

impl RunContext {
    pub(crate) fn new(job: Job) -> Self {
        Self {
            job,
            placements: Vec::new(),
            admitted: false,
            plan: Vec::new(),
            fiducial_overrides: HashMap::new(),
            started_at: None,
            total_parts_placed: 0,
        }
    }

    /// Build the placement records for the run. Runs once per job.
    pub(crate) fn admit(&mut self) {
        if self.admitted {
            return;
        }
        self.placements.clear();
        self.plan.clear();
        self.fiducial_overrides.clear();
        self.total_parts_placed = 0;
        self.started_at = Some(Utc::now());

        for (board_index, bl) in self.job.board_locations.iter().enumerate() {
            if !bl.enabled {
                continue;
            }
            for (placement_index, placement) in bl.board.placements.iter().enumerate() {
                if placement.placement_type != PlacementType::Place || placement.side != bl.side {
                    continue;
                }
                self.placements.push(JobPlacement::new(
                    PlacementKey::new(bl.id.clone(), placement.id.clone()),
                    board_index,
                    placement_index,
                    placement.part.as_ref().map(|p| p.id.clone()),
                ));
            }
        }
        self.admitted = true;
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Board location ids must be unique in the job, placement ids unique per board.
    /// Recovery commands address records and boards by these ids.
    pub(crate) fn check_identities(job: &Job) -> Result<(), JobError> {
        let mut boards = HashSet::new();
        for bl in &job.board_locations {
            if !boards.insert(&bl.id) {
                return Err(JobError::misuse(format!(
                    "duplicate board location id {}",
                    bl.id
                )));
            }
            let mut placements = HashSet::new();
            for placement in &bl.board.placements {
                if !placements.insert(&placement.id) {
                    return Err(JobError::misuse(format!(
                        "duplicate placement id {} on board {}",
                        placement.id, bl.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Records in admission order
    pub fn placements(&self) -> &[JobPlacement] {
        &self.placements
    }

    pub fn cycle_plan(&self) -> &[PlannedPlacement] {
        &self.plan
    }

    pub fn fiducial_override(&self, board: &BoardLocationId) -> Option<&Location> {
        self.fiducial_overrides.get(board)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn total_parts_placed(&self) -> u64 {
        self.total_parts_placed
    }

    pub fn placement(&self, key: &PlacementKey) -> Option<&JobPlacement> {
        self.placements.iter().find(|r| r.key() == key)
    }

    pub fn placements_with_status(&self, status: PlacementStatus) -> impl Iterator<Item = &JobPlacement> {
        self.placements.iter().filter(move |r| r.status() == status)
    }

    pub fn has_pending(&self) -> bool {
        self.placements
            .iter()
            .any(|r| r.status() == PlacementStatus::Pending)
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.placements.len(),
            parts_placed: self.total_parts_placed,
            ..Default::default()
        };
        for record in &self.placements {
            match record.status() {
                PlacementStatus::Pending => summary.pending += 1,
                PlacementStatus::Processing => summary.processing += 1,
                PlacementStatus::Placed => summary.placed += 1,
                PlacementStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub(crate) fn board_of(&self, record: &JobPlacement) -> Option<&BoardLocation> {
        self.job.board_locations.get(record.board_index())
    }

    pub(crate) fn placement_of(&self, record: &JobPlacement) -> Option<&Placement> {
        self.board_of(record)
            .and_then(|bl| bl.board.placements.get(record.placement_index()))
    }

    pub(crate) fn part_of(&self, record: &JobPlacement) -> Option<&Part> {
        self.placement_of(record).and_then(|p| p.part.as_ref())
    }

    /// Part for the record behind a plan entry
    pub(crate) fn planned_part(&self, entry: usize) -> Result<Part, JobError> {
        self.plan
            .get(entry)
            .and_then(|e| self.placements.get(e.record_index()))
            .and_then(|r| self.part_of(r))
            .cloned()
            .ok_or_else(|| JobError::invalid_state(format!("plan entry {entry} has no part")))
    }
}

/// Record counts for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub placed: usize,
    pub skipped: usize,
    pub parts_placed: u64,
}

/// Collaborators and settings handed to every phase
pub(crate) struct PhaseEnv<'a> {
    pub machine: &'a dyn Machine,
    pub config: &'a EngineConfig,
    pub status: &'a StatusChannel,
    pub metrics: Option<&'a MetricsCollector>,
    pub cancel: CancellationToken,
}

impl PhaseEnv<'_> {
    /// Run a machine operation, dropping it if the job is aborted first
    pub async fn call<T, F>(&self, operation: F) -> Result<T, JobError>
    where
        F: Future<Output = Result<T, MachineError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(JobError::Aborted),
            result = operation => result.map_err(JobError::from),
        }
    }

    /// Fail with [`JobError::Aborted`] if an abort was requested
    pub fn checkpoint(&self) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            return Err(JobError::Aborted);
        }
        Ok(())
    }

    pub fn status(&self, text: &str) {
        self.status.fire(text);
    }
}
