use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MachineError {
    #[error("no default head configured")]
    NoDefaultHead,

    #[error("motion failed on {target}: {reason}")]
    Motion { target: String, reason: String },

    #[error("feed failed on feeder {feeder}: {reason}")]
    Feed { feeder: String, reason: String },

    #[error("pick failed on nozzle {nozzle}: {reason}")]
    Pick { nozzle: String, reason: String },

    #[error("place failed on nozzle {nozzle}: {reason}")]
    Place { nozzle: String, reason: String },

    #[error("release failed on nozzle {nozzle}: {reason}")]
    Release { nozzle: String, reason: String },

    #[error("alignment failed for part {part}: {reason}")]
    Alignment { part: String, reason: String },

    #[error("vision failed: {0}")]
    Vision(String),

    #[error("driver communication error: {0}")]
    Communication(String),
}
