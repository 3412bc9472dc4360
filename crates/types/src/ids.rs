use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identity of one board instance placed on the machine
    BoardLocationId
);

string_id!(
    /// Reference designator of a placement (e.g. "R12"), unique within a board
    PlacementId
);

string_id!(
    /// Identity of a part in the part library
    PartId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_equality() {
        let a = PartId::new("R0603-1K");
        let b: PartId = "R0603-1K".into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "R0603-1K");
        assert_eq!(a.as_str(), "R0603-1K");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = PlacementId::new("C3");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"C3\"");
    }
}
