//! The serde document model for the three input documents.
//!
//! The catalog document is an array of [`PackageRecord`]s. The initial
//! state and the constraints documents are plain arrays of reference
//! strings and need no dedicated types; [`crate::Request::parse`] consumes
//! them directly.

use serde::{Deserialize, Serialize};

/// One package record of the catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    /// The package name.
    pub name: String,

    /// The raw version string.
    pub version: String,

    /// The declared size, which is the cost of installing this package.
    #[serde(default)]
    pub size: u64,

    /// Dependency groups. Each inner array is a disjunction of reference
    /// strings; at least one match per group must be installed alongside
    /// the package.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<Vec<String>>,

    /// References to packages that cannot be co-installed with this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
}
