pub mod board;
pub mod ids;
pub mod job;
pub mod location;
pub mod part;
pub mod placement;

pub use board::*;
pub use ids::*;
pub use job::*;
pub use location::*;
pub use part::*;
pub use placement::*;

/// Job file format version understood by this crate
pub const JOB_FORMAT_VERSION: &str = "1.0";
