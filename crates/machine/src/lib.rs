//! Machine-side collaborators consumed by the job sequencer
//!
//! The sequencer only issues semantic operations (safe-Z moves, feed, pick,
//! align, place, locate fiducials) and reacts to their success or failure.
//! Motion control, driver protocols and vision live behind these traits.

pub mod error;
pub mod sim;
pub mod traits;

pub use error::MachineError;
pub use traits::{AlignmentOffset, Feeder, FiducialLocator, Head, Machine, Nozzle, PartAlignment};
