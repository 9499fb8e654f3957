//! Scheme types
//!
//! A scheme is a saved range preset: a user-chosen name plus the inclusive
//! bounds it stands for.

use serde::{Deserialize, Serialize};

/// A named integer range preset.
///
/// Identity is structural: two schemes with the same name and bounds are the
/// same scheme. Deletion relies on this, so saved duplicates are removed
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    /// Display name, not required to be unique
    pub name: String,
    /// Inclusive lower bound
    pub min: i64,
    /// Inclusive upper bound
    pub max: i64,
}

impl Scheme {
    /// Create a new scheme. Bounds are stored exactly as given.
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }
}
