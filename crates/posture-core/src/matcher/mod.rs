//! Posture matching strategies.
//!
//! A matcher maps a (smoothed) feature vector to one label of a closed set.
//! Three interchangeable strategies are provided:
//!
//! - **Nearest neighbour:** weighted Euclidean distance against a
//!   [`ReferenceStore`](crate::reference::ReferenceStore), optionally limited
//!   by a per-feature tolerance.
//! - **Threshold bands:** ordered per-label feature intervals with a
//!   lateral-gaze override.
//! - **Relative height:** nose height against the mean shoulder height.

pub mod bands;
pub mod nearest;
pub mod relative;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

pub use bands::{Band, BandRule, ThresholdMatcher};
pub use nearest::{FeatureWeights, MatchTolerance, NearestNeighborMatcher, Neighbor};
pub use relative::{RelativeHeightConfig, RelativeHeightMatcher};

pub const LABEL_READING: &str = "Leyendo";
pub const LABEL_SLOUCHED: &str = "Encorvado";
pub const LABEL_LOOKING_AHEAD: &str = "Mirando";
pub const LABEL_LOOKING_SIDEWAYS: &str = "Mirando hacia un lado";
pub const LABEL_UNKNOWN: &str = "Desconocido";

/// Trait implemented by every matching strategy.
pub trait PostureMatcher: Send + Sync {
    /// Label for the given feature vector. Never fails; unmatched input
    /// yields the configured unknown label.
    fn classify(&self, features: &FeatureVector) -> &str;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Which strategy a classifier uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    #[default]
    NearestNeighbor,
    ThresholdBands,
    RelativeHeight,
}

impl MatchStrategy {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "nearest" | "nearest_neighbor" | "nn" => Some(Self::NearestNeighbor),
            "bands" | "threshold" | "threshold_bands" => Some(Self::ThresholdBands),
            "relative" | "relative_height" => Some(Self::RelativeHeight),
            _ => None,
        }
    }

    /// Whether this strategy needs a reference dataset.
    pub fn needs_reference(self) -> bool {
        matches!(self, Self::NearestNeighbor)
    }
}

/// Fixed labels that are not tied to a reference sample or band rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Fallback when nothing matches.
    pub unknown: String,

    /// Returned by the lateral-gaze override.
    pub looking_sideways: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            unknown: LABEL_UNKNOWN.to_string(),
            looking_sideways: LABEL_LOOKING_SIDEWAYS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            MatchStrategy::parse("nearest"),
            Some(MatchStrategy::NearestNeighbor)
        );
        assert_eq!(
            MatchStrategy::parse("bands"),
            Some(MatchStrategy::ThresholdBands)
        );
        assert_eq!(
            MatchStrategy::parse("relative"),
            Some(MatchStrategy::RelativeHeight)
        );
        assert_eq!(MatchStrategy::parse("svm"), None);
        assert!(MatchStrategy::NearestNeighbor.needs_reference());
        assert!(!MatchStrategy::ThresholdBands.needs_reference());
        assert!(!MatchStrategy::RelativeHeight.needs_reference());
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&MatchStrategy::ThresholdBands).unwrap();
        assert_eq!(json, "\"threshold_bands\"");
        let json = serde_json::to_string(&MatchStrategy::RelativeHeight).unwrap();
        assert_eq!(json, "\"relative_height\"");
    }
}
