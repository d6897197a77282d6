//! Shared types used across SurgeGrid crates.

use serde::{Deserialize, Serialize};

/// Name of a geographic region (e.g. "oregon").
pub type RegionName = String;

/// Identifier of a server size class in the capacity catalog (e.g. "c16").
pub type InstanceType = String;

/// Load classification of a server, derived from its active process count
/// relative to the thresholds of its instance type.
///
/// A server occupies exactly one bucket at any instant. `ScalingDown` is
/// terminal: a server enters it only at zero active processes and is
/// decommissioned by its controller on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadBucket {
    /// Zero active processes; the server is being decommissioned.
    ScalingDown,
    /// Between one process and the minimum threshold (inclusive).
    Underloaded,
    /// Between the minimum (exclusive) and maximum threshold (inclusive).
    Nominal,
    /// Above the maximum threshold but below the absolute limit.
    Overloaded,
    /// At the absolute limit; no further placements allowed.
    Saturated,
}

impl LoadBucket {
    /// The four buckets a controller keeps collections for, in placement
    /// priority order. `ScalingDown` is not a collection servers live in.
    pub const PLACEABLE: [LoadBucket; 4] = [
        LoadBucket::Underloaded,
        LoadBucket::Nominal,
        LoadBucket::Overloaded,
        LoadBucket::Saturated,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LoadBucket::ScalingDown => "scaling_down",
            LoadBucket::Underloaded => "underloaded",
            LoadBucket::Nominal => "nominal",
            LoadBucket::Overloaded => "overloaded",
            LoadBucket::Saturated => "saturated",
        }
    }
}

impl std::fmt::Display for LoadBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeable_excludes_scaling_down() {
        assert!(!LoadBucket::PLACEABLE.contains(&LoadBucket::ScalingDown));
        assert_eq!(LoadBucket::PLACEABLE.len(), 4);
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(LoadBucket::Underloaded.label(), "underloaded");
        assert_eq!(LoadBucket::ScalingDown.to_string(), "scaling_down");
    }
}
