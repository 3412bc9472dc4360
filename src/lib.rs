//! PnP Sequencer
//!
//! Job sequencing for pick-and-place machines. The workspace is split into:
//!
//! - [`types`]: the job aggregate (boards, placements, parts, locations)
//! - [`machine`]: collaborator traits the engine drives, plus a simulator
//! - [`engine`]: the resumable phase engine and its recovery protocol
//! - [`config`]: layered configuration loading and validation
//! - [`metrics`]: Prometheus metrics and tracing setup

pub use pnp_sequencer_config as config;
pub use pnp_sequencer_engine as engine;
pub use pnp_sequencer_machine as machine;
pub use pnp_sequencer_metrics as metrics;
pub use pnp_sequencer_types as types;

pub use pnp_sequencer_engine::{
    AbortHandle, Command, JobEngine, JobError, JobFailure, Phase, PlacementStatus,
};
