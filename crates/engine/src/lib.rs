//! Job execution engine for pick-and-place assembly
//!
//! The engine is a resumable, single-writer state machine. Each call to
//! [`JobEngine::next`] runs the current phase once; the phase advances the
//! phase pointer, leaves it in place to be retried, or fails with a
//! [`JobFailure`] carrying the recovery [`Command`]s the caller may execute
//! through [`JobEngine::next_with`] before re-entering the same phase.

pub mod abort;
pub mod command;
pub mod context;
pub mod engine;
pub mod error;
mod execution;
mod fiducial;
pub mod phase;
pub mod plan;
mod planner;
mod preflight;
pub mod record;
mod recovery;
pub mod status;


// Re-export main types
pub use abort::AbortHandle;
pub use command::Command;
pub use context::{RunContext, RunSummary};
pub use engine::JobEngine;
pub use error::{JobError, JobFailure, PartAvailabilityReason, PlacementValidationReason};
pub use phase::{Phase, PhaseOutcome};
pub use plan::PlannedPlacement;
pub use pnp_sequencer_config::EngineConfig;
pub use record::{JobPlacement, PlacementKey, PlacementStatus};
pub use status::{StatusChannel, StatusListener, SubscriptionId};
