use async_trait::async_trait;
use pnp_sequencer_types::{BoardLocation, Location, Part, PartId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::MachineError;

/// Machine lookup for the resources a job needs
pub trait Machine: Send + Sync {
    fn default_head(&self) -> Result<Arc<dyn Head>, MachineError>;

    fn feeders(&self) -> Vec<Arc<dyn Feeder>>;

    /// Bottom vision or other alignment station, if fitted
    fn part_alignment(&self) -> Option<Arc<dyn PartAlignment>>;

    fn fiducial_locator(&self) -> Option<Arc<dyn FiducialLocator>>;
}

/// A head carrying one or more nozzles
#[async_trait]
pub trait Head: Send + Sync {
    fn id(&self) -> &str;

    fn nozzles(&self) -> Vec<Arc<dyn Nozzle>>;

    async fn move_to_safe_z(&self) -> Result<(), MachineError>;

    /// Discard whatever any nozzle on this head is holding
    async fn release_all(&self) -> Result<(), MachineError>;

    async fn park(&self) -> Result<(), MachineError>;
}

#[async_trait]
pub trait Nozzle: Send + Sync {
    fn id(&self) -> &str;

    /// Whether a nozzle tip loaded on (or available to) this nozzle can handle the part
    fn can_handle(&self, part: &Part) -> bool;

    fn held_part(&self) -> Option<PartId>;

    async fn pick(&self, part: &Part, location: Location) -> Result<(), MachineError>;

    async fn place(&self, part: &Part, location: Location) -> Result<(), MachineError>;

    async fn release(&self) -> Result<(), MachineError>;
}

#[async_trait]
pub trait Feeder: Send + Sync {
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn can_feed(&self, part: &Part) -> bool;

    /// False while the feeder is busy or out of parts
    fn is_available(&self) -> bool;

    /// Present a part for the given nozzle to pick
    async fn feed(&self, nozzle: &dyn Nozzle) -> Result<(), MachineError>;

    async fn pick_location(&self) -> Result<Location, MachineError>;
}

/// Offset of a held part relative to the nozzle axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignmentOffset {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl AlignmentOffset {
    pub const fn new(x: f64, y: f64, rotation: f64) -> Self {
        Self { x, y, rotation }
    }

    pub fn as_location(&self) -> Location {
        Location::new(self.x, self.y, 0.0, self.rotation)
    }
}

#[async_trait]
pub trait PartAlignment: Send + Sync {
    async fn find_offset(
        &self,
        part: &Part,
        nozzle: &dyn Nozzle,
    ) -> Result<AlignmentOffset, MachineError>;
}

#[async_trait]
pub trait FiducialLocator: Send + Sync {
    /// Corrected board origin computed from the board's fiducials
    async fn locate_board(&self, board_location: &BoardLocation) -> Result<Location, MachineError>;
}
