use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{Location, Part, PlacementId};

/// Side of the board a placement or board instance faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Top,
    Bottom,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Top => f.write_str("top"),
            Side::Bottom => f.write_str("bottom"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown board side: {0}")]
pub struct ParseSideError(String);

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Side::Top),
            "bottom" => Ok(Side::Bottom),
            _ => Err(ParseSideError(s.to_string())),
        }
    }
}

/// What the machine should do with a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementType {
    /// Pick and place the part
    #[default]
    Place,
    /// Reference mark used for board offset correction
    Fiducial,
    /// Present in the design but not populated
    Ignore,
}

/// A single design placement on a board, relative to the board origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,

    /// Part to place; `None` when the design references a part missing from the library
    #[serde(default)]
    pub part: Option<Part>,

    #[serde(default)]
    pub side: Side,

    #[serde(default, rename = "type")]
    pub placement_type: PlacementType,

    pub location: Location,
}

impl Placement {
    pub fn new(id: impl Into<PlacementId>, part: Option<Part>, location: Location) -> Self {
        Self {
            id: id.into(),
            part,
            side: Side::Top,
            placement_type: PlacementType::Place,
            location,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_type(mut self, placement_type: PlacementType) -> Self {
        self.placement_type = placement_type;
        self
    }
}
