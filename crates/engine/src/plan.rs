use pnp_sequencer_machine::{AlignmentOffset, Feeder, Nozzle};
use std::fmt;
use std::sync::Arc;

/// One nozzle's assignment in the current cycle
#[derive(Clone)]
pub struct PlannedPlacement {
    nozzle: Arc<dyn Nozzle>,
    record: usize,
    pub(crate) feeder: Option<Arc<dyn Feeder>>,
    pub(crate) alignment_offset: Option<AlignmentOffset>,
    pub(crate) fed: bool,
    pub(crate) step_complete: bool,
}

impl PlannedPlacement {
    pub(crate) fn new(nozzle: Arc<dyn Nozzle>, record: usize) -> Self {
        Self {
            nozzle,
            record,
            feeder: None,
            alignment_offset: None,
            fed: false,
            step_complete: false,
        }
    }

    pub fn nozzle(&self) -> &Arc<dyn Nozzle> {
        &self.nozzle
    }

    /// Index of the placement record in [`crate::RunContext::placements`]
    pub fn record_index(&self) -> usize {
        self.record
    }

    pub fn feeder(&self) -> Option<&Arc<dyn Feeder>> {
        self.feeder.as_ref()
    }

    pub fn alignment_offset(&self) -> Option<AlignmentOffset> {
        self.alignment_offset
    }

    pub fn is_fed(&self) -> bool {
        self.fed
    }

    pub fn is_step_complete(&self) -> bool {
        self.step_complete
    }
}

impl fmt::Debug for PlannedPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedPlacement")
            .field("nozzle", &self.nozzle.id())
            .field("record", &self.record)
            .field("feeder", &self.feeder.as_ref().map(|f| f.id().to_string()))
            .field("alignment_offset", &self.alignment_offset)
            .field("fed", &self.fed)
            .field("step_complete", &self.step_complete)
            .finish()
    }
}

/// Reset the per-step flag on every entry before the next step begins
pub(crate) fn reset_steps(plan: &mut [PlannedPlacement]) {
    for entry in plan {
        entry.step_complete = false;
    }
}
