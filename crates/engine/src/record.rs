//! Per-run placement records

use pnp_sequencer_types::{BoardLocationId, PartId, PlacementId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::JobError;

/// Progress of one placement within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementStatus {
    Pending,
    Processing,
    Placed,
    Skipped,
}

impl PlacementStatus {
    /// Placed and Skipped records never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlacementStatus::Placed | PlacementStatus::Skipped)
    }

    fn can_advance_to(&self, next: PlacementStatus) -> bool {
        use PlacementStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Skipped) | (Processing, Placed) | (Processing, Skipped)
        )
    }
}

impl fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlacementStatus::Pending => "Pending",
            PlacementStatus::Processing => "Processing",
            PlacementStatus::Placed => "Placed",
            PlacementStatus::Skipped => "Skipped",
        };
        f.write_str(s)
    }
}

/// Identity of a placement within a job: the board instance plus the placement id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementKey {
    pub board: BoardLocationId,
    pub placement: PlacementId,
}

impl PlacementKey {
    pub fn new(board: impl Into<BoardLocationId>, placement: impl Into<PlacementId>) -> Self {
        Self {
            board: board.into(),
            placement: placement.into(),
        }
    }
}

impl fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.board, self.placement)
    }
}

/// One placement admitted into the run
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlacement {
    key: PlacementKey,
    board_index: usize,
    placement_index: usize,
    part: Option<PartId>,
    status: PlacementStatus,
}

impl JobPlacement {
    pub(crate) fn new(
        key: PlacementKey,
        board_index: usize,
        placement_index: usize,
        part: Option<PartId>,
    ) -> Self {
        Self {
            key,
            board_index,
            placement_index,
            part,
            status: PlacementStatus::Pending,
        }
    }

    pub fn key(&self) -> &PlacementKey {
        &self.key
    }

    pub fn board(&self) -> &BoardLocationId {
        &self.key.board
    }

    pub fn placement_id(&self) -> &PlacementId {
        &self.key.placement
    }

    pub fn part_id(&self) -> Option<&PartId> {
        self.part.as_ref()
    }

    pub fn status(&self) -> PlacementStatus {
        self.status
    }

    pub(crate) fn board_index(&self) -> usize {
        self.board_index
    }

    pub(crate) fn placement_index(&self) -> usize {
        self.placement_index
    }

    /// Commit a status transition; terminal records reject every change
    pub(crate) fn advance(&mut self, next: PlacementStatus) -> Result<(), JobError> {
        if !self.status.can_advance_to(next) {
            return Err(JobError::misuse(format!(
                "placement {} cannot move from {} to {}",
                self.key, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobPlacement {
        JobPlacement::new(PlacementKey::new("b1", "R1"), 0, 0, Some("P1".into()))
    }

    #[test]
    fn test_new_record_is_pending() {
        let rec = record();
        assert_eq!(rec.status(), PlacementStatus::Pending);
        assert_eq!(rec.key().to_string(), "b1/R1");
    }

    #[test]
    fn test_forward_transitions() {
        let mut rec = record();
        rec.advance(PlacementStatus::Processing).unwrap();
        rec.advance(PlacementStatus::Placed).unwrap();
        assert!(rec.status().is_terminal());
    }

    #[test]
    fn test_terminal_records_are_immutable() {
        let mut rec = record();
        rec.advance(PlacementStatus::Skipped).unwrap();
        assert!(matches!(
            rec.advance(PlacementStatus::Processing),
            Err(JobError::ProtocolMisuse { .. })
        ));
        assert_eq!(rec.status(), PlacementStatus::Skipped);

        let mut placed = record();
        placed.advance(PlacementStatus::Processing).unwrap();
        placed.advance(PlacementStatus::Placed).unwrap();
        assert!(placed.advance(PlacementStatus::Skipped).is_err());
    }

    #[test]
    fn test_cannot_place_without_processing() {
        let mut rec = record();
        assert!(rec.advance(PlacementStatus::Placed).is_err());
        assert!(rec.advance(PlacementStatus::Pending).is_err());
    }
}
