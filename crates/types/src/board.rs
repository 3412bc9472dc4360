use serde::{Deserialize, Serialize};

use crate::{BoardLocationId, Location, Placement, PlacementType, Side};

/// A board design: a named list of placements
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Board {
    pub name: String,

    #[serde(default)]
    pub placements: Vec<Placement>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placements: Vec::new(),
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placements.push(placement);
        self
    }

    /// Fiducial placements usable for board offset correction
    pub fn fiducials(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| p.placement_type == PlacementType::Fiducial)
    }
}

/// One instance of a board design mounted on the machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardLocation {
    pub id: BoardLocationId,

    pub board: Board,

    /// Nominal board origin in machine coordinates
    pub location: Location,

    /// Side facing the head for this run
    #[serde(default)]
    pub side: Side,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether fiducials must be located before placing on this board
    #[serde(default)]
    pub check_fiducials: bool,
}

fn default_true() -> bool {
    true
}

impl BoardLocation {
    pub fn new(id: impl Into<BoardLocationId>, board: Board, location: Location) -> Self {
        Self {
            id: id.into(),
            board,
            location,
            side: Side::Top,
            enabled: true,
            check_fiducials: false,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_fiducial_check(mut self, check: bool) -> Self {
        self.check_fiducials = check;
        self
    }

    /// Machine-space location of a board-relative placement.
    ///
    /// `origin_override` replaces the nominal board origin, typically with the
    /// result of a fiducial check. Bottom-side boards are mirrored in X before
    /// the board rotation is applied.
    pub fn placement_location(
        &self,
        placement: &Placement,
        origin_override: Option<&Location>,
    ) -> Location {
        let origin = origin_override.unwrap_or(&self.location);

        let mut local = placement.location;
        if self.side == Side::Bottom {
            local.x = -local.x;
        }

        let rotated = local.rotate_xy(origin.rotation);
        Location {
            x: origin.x + rotated.x,
            y: origin.y + rotated.y,
            z: origin.z,
            rotation: local.rotation + origin.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Part;

    const EPS: f64 = 1e-9;

    fn board_with(placement: Placement) -> Board {
        Board::new("test").with_placement(placement)
    }

    #[test]
    fn test_placement_location_translates_by_origin() {
        let placement = Placement::new("R1", None, Location::new(5.0, 3.0, 0.0, 90.0));
        let bl = BoardLocation::new("b1", board_with(placement.clone()), Location::new(100.0, 50.0, -2.0, 0.0));

        let loc = bl.placement_location(&placement, None);
        assert_eq!(loc, Location::new(105.0, 53.0, -2.0, 90.0));
    }

    #[test]
    fn test_placement_location_uses_override_and_rotation() {
        let placement = Placement::new("R1", None, Location::xy(10.0, 0.0));
        let bl = BoardLocation::new("b1", board_with(placement.clone()), Location::xy(0.0, 0.0));
        let corrected = Location::new(1.0, 1.0, 0.0, 90.0);

        let loc = bl.placement_location(&placement, Some(&corrected));
        assert!((loc.x - 1.0).abs() < EPS);
        assert!((loc.y - 11.0).abs() < EPS);
        assert!((loc.rotation - 90.0).abs() < EPS);
    }

    #[test]
    fn test_placement_location_mirrors_bottom_side() {
        let placement = Placement::new("R1", None, Location::xy(10.0, 4.0)).with_side(Side::Bottom);
        let bl = BoardLocation::new("b1", board_with(placement.clone()), Location::xy(50.0, 0.0))
            .with_side(Side::Bottom);

        let loc = bl.placement_location(&placement, None);
        assert!((loc.x - 40.0).abs() < EPS);
        assert!((loc.y - 4.0).abs() < EPS);
    }

    #[test]
    fn test_fiducials_filter() {
        let board = Board::new("b")
            .with_placement(Placement::new("R1", Some(Part::new("r", 0.5)), Location::xy(1.0, 1.0)))
            .with_placement(
                Placement::new("FID1", None, Location::xy(0.0, 0.0)).with_type(PlacementType::Fiducial),
            );
        let ids: Vec<_> = board.fiducials().map(|p| p.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["FID1".to_string()]);
    }

    #[test]
    fn test_board_location_defaults_enabled() {
        let json = r#"{"id": "b1", "board": {"name": "x"}, "location": {"x": 0, "y": 0}}"#;
        let bl: BoardLocation = serde_json::from_str(json).unwrap();
        assert!(bl.enabled);
        assert!(!bl.check_fiducials);
    }
}
