//! In-memory simulated machine
//!
//! Every component records the operations it performs into a shared
//! [`OperationLog`] and supports failure injection, which makes the
//! simulator suitable for dry runs and for exercising recovery paths.

use async_trait::async_trait;
use pnp_sequencer_types::{BoardLocation, BoardLocationId, Location, Part, PartId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::{
    AlignmentOffset, Feeder, FiducialLocator, Head, Machine, MachineError, Nozzle, PartAlignment,
};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ordered record of the operations performed by simulated components
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(operation = %entry, "simulated machine operation");
        locked(&self.entries).push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        locked(&self.entries).clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        locked(&self.entries)
            .iter()
            .filter(|e| e.contains(needle))
            .count()
    }

    pub fn clear(&self) {
        locked(&self.entries).clear();
    }
}

/// Simulated nozzle; handles every package unless restricted with [`SimNozzle::with_packages`]
pub struct SimNozzle {
    id: String,
    packages: Vec<String>,
    held: Mutex<Option<PartId>>,
    fail_next_pick: Mutex<Option<String>>,
    fail_next_place: Mutex<Option<String>>,
    pick_delay: Mutex<Option<Duration>>,
    log: OperationLog,
}

impl SimNozzle {
    pub fn new(id: impl Into<String>, log: &OperationLog) -> Self {
        Self {
            id: id.into(),
            packages: Vec::new(),
            held: Mutex::new(None),
            fail_next_pick: Mutex::new(None),
            fail_next_place: Mutex::new(None),
            pick_delay: Mutex::new(None),
            log: log.clone(),
        }
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn fail_next_pick(&self, reason: impl Into<String>) {
        *locked(&self.fail_next_pick) = Some(reason.into());
    }

    pub fn fail_next_place(&self, reason: impl Into<String>) {
        *locked(&self.fail_next_place) = Some(reason.into());
    }

    /// Make every pick take this long before completing
    pub fn set_pick_delay(&self, delay: Duration) {
        *locked(&self.pick_delay) = Some(delay);
    }

    /// Simulate a part left on the nozzle by a previous run
    pub fn set_held(&self, part: Option<PartId>) {
        *locked(&self.held) = part;
    }
}

#[async_trait]
impl Nozzle for SimNozzle {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_handle(&self, part: &Part) -> bool {
        if self.packages.is_empty() {
            return true;
        }
        part.package
            .as_ref()
            .is_some_and(|pkg| self.packages.iter().any(|p| p == pkg))
    }

    fn held_part(&self) -> Option<PartId> {
        locked(&self.held).clone()
    }

    async fn pick(&self, part: &Part, location: Location) -> Result<(), MachineError> {
        let delay = *locked(&self.pick_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = locked(&self.fail_next_pick).take() {
            return Err(MachineError::Pick {
                nozzle: self.id.clone(),
                reason,
            });
        }
        *locked(&self.held) = Some(part.id.clone());
        self.log.record(format!(
            "nozzle {} pick {} at {:.3},{:.3}",
            self.id, part.id, location.x, location.y
        ));
        Ok(())
    }

    async fn place(&self, part: &Part, location: Location) -> Result<(), MachineError> {
        if let Some(reason) = locked(&self.fail_next_place).take() {
            return Err(MachineError::Place {
                nozzle: self.id.clone(),
                reason,
            });
        }
        *locked(&self.held) = None;
        self.log.record(format!(
            "nozzle {} place {} at {:.3},{:.3},{:.3} rot {:.3}",
            self.id, part.id, location.x, location.y, location.z, location.rotation
        ));
        Ok(())
    }

    async fn release(&self) -> Result<(), MachineError> {
        if let Some(part) = locked(&self.held).take() {
            self.log.record(format!("nozzle {} release {}", self.id, part));
        }
        Ok(())
    }
}

pub struct SimHead {
    id: String,
    nozzles: Vec<Arc<SimNozzle>>,
    fail_next_safe_z: Mutex<Option<String>>,
    log: OperationLog,
}

impl SimHead {
    pub fn new(id: impl Into<String>, nozzles: Vec<Arc<SimNozzle>>, log: &OperationLog) -> Self {
        Self {
            id: id.into(),
            nozzles,
            fail_next_safe_z: Mutex::new(None),
            log: log.clone(),
        }
    }

    pub fn nozzle(&self, id: &str) -> Option<Arc<SimNozzle>> {
        self.nozzles.iter().find(|n| n.id == id).cloned()
    }

    pub fn fail_next_safe_z(&self, reason: impl Into<String>) {
        *locked(&self.fail_next_safe_z) = Some(reason.into());
    }
}

#[async_trait]
impl Head for SimHead {
    fn id(&self) -> &str {
        &self.id
    }

    fn nozzles(&self) -> Vec<Arc<dyn Nozzle>> {
        self.nozzles
            .iter()
            .map(|n| n.clone() as Arc<dyn Nozzle>)
            .collect()
    }

    async fn move_to_safe_z(&self) -> Result<(), MachineError> {
        if let Some(reason) = locked(&self.fail_next_safe_z).take() {
            return Err(MachineError::Motion {
                target: self.id.clone(),
                reason,
            });
        }
        self.log.record(format!("head {} safe_z", self.id));
        Ok(())
    }

    async fn release_all(&self) -> Result<(), MachineError> {
        for nozzle in &self.nozzles {
            nozzle.release().await?;
        }
        Ok(())
    }

    async fn park(&self) -> Result<(), MachineError> {
        self.log.record(format!("head {} park", self.id));
        Ok(())
    }
}

/// Simulated feeder holding a single part type; unlimited unless a count is set
pub struct SimFeeder {
    id: String,
    part: PartId,
    location: Location,
    enabled: AtomicBool,
    remaining: Mutex<Option<u32>>,
    fail_next_feed: Mutex<Option<String>>,
    log: OperationLog,
}

impl SimFeeder {
    pub fn new(id: impl Into<String>, part: impl Into<PartId>, location: Location, log: &OperationLog) -> Self {
        Self {
            id: id.into(),
            part: part.into(),
            location,
            enabled: AtomicBool::new(true),
            remaining: Mutex::new(None),
            fail_next_feed: Mutex::new(None),
            log: log.clone(),
        }
    }

    pub fn with_count(self, count: u32) -> Self {
        *locked(&self.remaining) = Some(count);
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_count(&self, count: Option<u32>) {
        *locked(&self.remaining) = count;
    }

    pub fn fail_next_feed(&self, reason: impl Into<String>) {
        *locked(&self.fail_next_feed) = Some(reason.into());
    }
}

#[async_trait]
impl Feeder for SimFeeder {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn can_feed(&self, part: &Part) -> bool {
        part.id == self.part
    }

    fn is_available(&self) -> bool {
        self.is_enabled() && *locked(&self.remaining) != Some(0)
    }

    async fn feed(&self, nozzle: &dyn Nozzle) -> Result<(), MachineError> {
        if let Some(reason) = locked(&self.fail_next_feed).take() {
            return Err(MachineError::Feed {
                feeder: self.id.clone(),
                reason,
            });
        }
        {
            let mut remaining = locked(&self.remaining);
            match remaining.as_mut() {
                Some(0) => {
                    return Err(MachineError::Feed {
                        feeder: self.id.clone(),
                        reason: "feeder is empty".to_string(),
                    })
                }
                Some(count) => *count -= 1,
                None => {}
            }
        }
        self.log.record(format!("feeder {} feed {} for {}", self.id, self.part, nozzle.id()));
        Ok(())
    }

    async fn pick_location(&self) -> Result<Location, MachineError> {
        Ok(self.location)
    }
}

/// Simulated bottom-vision station returning fixed offsets per part
#[derive(Default)]
pub struct SimAlignment {
    offsets: Mutex<HashMap<PartId, AlignmentOffset>>,
    failing: Mutex<HashSet<PartId>>,
    log: OperationLog,
}

impl SimAlignment {
    pub fn new(log: &OperationLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    pub fn set_offset(&self, part: impl Into<PartId>, offset: AlignmentOffset) {
        locked(&self.offsets).insert(part.into(), offset);
    }

    pub fn fail_part(&self, part: impl Into<PartId>) {
        locked(&self.failing).insert(part.into());
    }
}

#[async_trait]
impl PartAlignment for SimAlignment {
    async fn find_offset(
        &self,
        part: &Part,
        nozzle: &dyn Nozzle,
    ) -> Result<AlignmentOffset, MachineError> {
        if locked(&self.failing).contains(&part.id) {
            return Err(MachineError::Alignment {
                part: part.id.to_string(),
                reason: "part not found in camera view".to_string(),
            });
        }
        self.log.record(format!("align {} on {}", part.id, nozzle.id()));
        Ok(locked(&self.offsets).get(&part.id).copied().unwrap_or_default())
    }
}

/// Simulated fiducial vision; boards without a configured correction locate at nominal
#[derive(Default)]
pub struct SimFiducialLocator {
    corrections: Mutex<HashMap<BoardLocationId, Location>>,
    failing: Mutex<HashSet<BoardLocationId>>,
    log: OperationLog,
}

impl SimFiducialLocator {
    pub fn new(log: &OperationLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    /// Offset added to the nominal board origin when located
    pub fn set_correction(&self, board: impl Into<BoardLocationId>, correction: Location) {
        locked(&self.corrections).insert(board.into(), correction);
    }

    pub fn fail_board(&self, board: impl Into<BoardLocationId>) {
        locked(&self.failing).insert(board.into());
    }

    pub fn clear_failure(&self, board: &BoardLocationId) {
        locked(&self.failing).remove(board);
    }
}

#[async_trait]
impl FiducialLocator for SimFiducialLocator {
    async fn locate_board(&self, board_location: &BoardLocation) -> Result<Location, MachineError> {
        if locked(&self.failing).contains(&board_location.id) {
            return Err(MachineError::Vision(format!(
                "fiducials not found on board {}",
                board_location.id
            )));
        }
        self.log.record(format!("locate board {}", board_location.id));
        let correction = locked(&self.corrections)
            .get(&board_location.id)
            .copied()
            .unwrap_or_default();
        Ok(board_location.location.add(correction))
    }
}

/// A complete simulated machine
pub struct SimulatedMachine {
    head: Option<Arc<SimHead>>,
    feeders: Vec<Arc<SimFeeder>>,
    alignment: Option<Arc<SimAlignment>>,
    locator: Option<Arc<dyn FiducialLocator>>,
    log: OperationLog,
}

impl SimulatedMachine {
    pub fn new(log: &OperationLog) -> Self {
        Self {
            head: None,
            feeders: Vec::new(),
            alignment: None,
            locator: None,
            log: log.clone(),
        }
    }

    pub fn with_head(mut self, head: Arc<SimHead>) -> Self {
        self.head = Some(head);
        self
    }

    pub fn with_feeder(mut self, feeder: Arc<SimFeeder>) -> Self {
        self.feeders.push(feeder);
        self
    }

    pub fn with_alignment(mut self, alignment: Arc<SimAlignment>) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_fiducial_locator(mut self, locator: Arc<dyn FiducialLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn feeder(&self, id: &str) -> Option<Arc<SimFeeder>> {
        self.feeders.iter().find(|f| f.id == id).cloned()
    }
}

impl Machine for SimulatedMachine {
    fn default_head(&self) -> Result<Arc<dyn Head>, MachineError> {
        self.head
            .clone()
            .map(|h| h as Arc<dyn Head>)
            .ok_or(MachineError::NoDefaultHead)
    }

    fn feeders(&self) -> Vec<Arc<dyn Feeder>> {
        self.feeders
            .iter()
            .map(|f| f.clone() as Arc<dyn Feeder>)
            .collect()
    }

    fn part_alignment(&self) -> Option<Arc<dyn PartAlignment>> {
        self.alignment.clone().map(|a| a as Arc<dyn PartAlignment>)
    }

    fn fiducial_locator(&self) -> Option<Arc<dyn FiducialLocator>> {
        self.locator.clone()
    }
}
