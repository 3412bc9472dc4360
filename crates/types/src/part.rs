use serde::{Deserialize, Serialize};

use crate::PartId;

/// A part from the part library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,

    /// Height above the board surface in millimetres
    pub height: f64,

    /// Package name used to match nozzle tips (e.g. "0603", "SOIC-8")
    #[serde(default)]
    pub package: Option<String>,
}

impl Part {
    pub fn new(id: impl Into<PartId>, height: f64) -> Self {
        Self {
            id: id.into(),
            height,
            package: None,
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }
}
