use serde::{Deserialize, Serialize};

use crate::{BoardLocation, BoardLocationId, PartId, PlacementType};

/// A job: the ordered boards to assemble in one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    pub name: String,

    #[serde(default)]
    pub board_locations: Vec<BoardLocation>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            board_locations: Vec::new(),
        }
    }

    pub fn with_board(mut self, board_location: BoardLocation) -> Self {
        self.board_locations.push(board_location);
        self
    }

    pub fn board_location(&self, id: &BoardLocationId) -> Option<&BoardLocation> {
        self.board_locations.iter().find(|bl| &bl.id == id)
    }

    pub fn board_location_mut(&mut self, id: &BoardLocationId) -> Option<&mut BoardLocation> {
        self.board_locations.iter_mut().find(|bl| &bl.id == id)
    }

    pub fn enabled_boards(&self) -> impl Iterator<Item = &BoardLocation> {
        self.board_locations.iter().filter(|bl| bl.enabled)
    }

    /// Distinct parts referenced by placeable placements on enabled boards,
    /// in first-seen order
    pub fn required_parts(&self) -> Vec<PartId> {
        let mut parts: Vec<PartId> = Vec::new();
        for bl in self.enabled_boards() {
            for placement in &bl.board.placements {
                if placement.placement_type != PlacementType::Place || placement.side != bl.side {
                    continue;
                }
                if let Some(part) = &placement.part {
                    if !parts.contains(&part.id) {
                        parts.push(part.id.clone());
                    }
                }
            }
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Board, Location, Part, Placement, Side};

    fn sample_job() -> Job {
        let board = Board::new("controller")
            .with_placement(Placement::new("R1", Some(Part::new("R-1K", 0.5)), Location::xy(1.0, 1.0)))
            .with_placement(Placement::new("R2", Some(Part::new("R-1K", 0.5)), Location::xy(2.0, 1.0)))
            .with_placement(
                Placement::new("U1", Some(Part::new("MCU", 1.2)), Location::xy(5.0, 5.0))
                    .with_side(Side::Bottom),
            )
            .with_placement(Placement::new("C1", Some(Part::new("C-100N", 0.8)), Location::xy(3.0, 1.0)));

        Job::new("sample")
            .with_board(BoardLocation::new("b1", board.clone(), Location::xy(0.0, 0.0)))
            .with_board(BoardLocation::new("b2", board, Location::xy(100.0, 0.0)).with_enabled(false))
    }

    #[test]
    fn test_required_parts_skips_other_side_and_disabled() {
        let job = sample_job();
        let parts = job.required_parts();
        assert_eq!(parts, vec![PartId::new("R-1K"), PartId::new("C-100N")]);
    }

    #[test]
    fn test_board_lookup() {
        let mut job = sample_job();
        assert!(job.board_location(&BoardLocationId::new("b2")).is_some());
        assert!(job.board_location(&BoardLocationId::new("nope")).is_none());

        job.board_location_mut(&BoardLocationId::new("b2")).unwrap().enabled = true;
        assert_eq!(job.enabled_boards().count(), 2);
    }

    #[test]
    fn test_job_json_round_trip_preserves_flags() {
        let job = sample_job();
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
        assert!(!back.board_locations[1].enabled);
    }
}
