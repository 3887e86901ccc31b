//! Dependency identity - WHICH buildable unit (name + version).
//!
//! A `DepKey` names one concrete entry in a plugin's dependency catalogue.
//! Versions are opaque release tags (`"R70"`, `"1.2.1"`, `"master"`); they
//! are compared for equality only, never ordered semantically.

use std::fmt;

/// Identifies one buildable unit in the dependency catalogue.
///
/// Used as the visitation token for cycle detection; error messages format
/// it as `name@version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepKey {
    name: String,
    version: String,
}

impl DepKey {
    /// Create a new dependency key.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        DepKey {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Get the dependency name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the version tag.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
