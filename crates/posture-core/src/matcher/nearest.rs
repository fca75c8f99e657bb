//! Weighted nearest-neighbour matching against a reference store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use super::{LabelConfig, PostureMatcher};
use crate::features::FeatureVector;
use crate::reference::ReferenceStore;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-feature distance weights. They must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub nose_y: f64,
    pub left_shoulder_y: f64,
    pub right_shoulder_y: f64,
    pub neck_angle_deg: f64,
    pub torso_angle_deg: f64,
}

impl Default for FeatureWeights {
    /// Relative weights 0.2 per vertical position and 0.3 per angle,
    /// rescaled to sum to 1.0.
    fn default() -> Self {
        Self::from_relative([0.2, 0.2, 0.2, 0.3, 0.3])
    }
}

impl FeatureWeights {
    /// Build weights proportional to `relative`, rescaled to sum to 1.0.
    pub fn from_relative(relative: [f64; 5]) -> Self {
        let sum: f64 = relative.iter().sum();
        let [nose_y, left_shoulder_y, right_shoulder_y, neck_angle_deg, torso_angle_deg] =
            relative.map(|w| if sum > 0.0 { w / sum } else { 0.0 });
        Self {
            nose_y,
            left_shoulder_y,
            right_shoulder_y,
            neck_angle_deg,
            torso_angle_deg,
        }
    }

    /// Weights in [`Feature::REFERENCE`](crate::features::Feature::REFERENCE) order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.nose_y,
            self.left_shoulder_y,
            self.right_shoulder_y,
            self.neck_angle_deg,
            self.torso_angle_deg,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    pub fn validate(&self) -> PosturaResult<()> {
        if let Some(w) = self
            .as_array()
            .into_iter()
            .find(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(PosturaError::config(format!(
                "distance weights must be finite and non-negative, got {w}"
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PosturaError::config(format!(
                "distance weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }

    /// Weighted Euclidean distance between two points.
    pub fn distance(&self, a: &[f64; 5], b: &[f64; 5]) -> f64 {
        self.as_array()
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(w, (x, y))| w * (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Per-feature acceptance limits on raw feature values.
///
/// A neighbour whose raw features differ from the query by this much or more
/// on any feature is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTolerance {
    /// Limit on nose and shoulder heights.
    pub positions: f64,
    /// Limit on neck and torso angles, in degrees.
    pub angles_deg: f64,
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self {
            positions: 0.03,
            angles_deg: 5.0,
        }
    }
}

impl MatchTolerance {
    pub fn validate(&self) -> PosturaResult<()> {
        for (name, value) in [("positions", self.positions), ("angles_deg", self.angles_deg)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PosturaError::config(format!(
                    "tolerance {name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Whether `candidate` lies strictly within the limits around `query`.
    pub fn accepts(&self, query: &FeatureVector, candidate: &FeatureVector) -> bool {
        let within = |a: f64, b: f64, limit: f64| (a - b).abs() < limit;
        within(query.nose_y, candidate.nose_y, self.positions)
            && within(query.left_shoulder_y, candidate.left_shoulder_y, self.positions)
            && within(query.right_shoulder_y, candidate.right_shoulder_y, self.positions)
            && within(query.neck_angle_deg, candidate.neck_angle_deg, self.angles_deg)
            && within(query.torso_angle_deg, candidate.torso_angle_deg, self.angles_deg)
    }
}

/// Closest reference sample to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    /// Position of the sample in load order.
    pub index: usize,
    pub label: &'a str,
    pub distance: f64,
}

/// Nearest-neighbour matcher over a shared reference store.
#[derive(Debug, Clone)]
pub struct NearestNeighborMatcher {
    store: Arc<ReferenceStore>,
    weights: FeatureWeights,
    labels: LabelConfig,
    tolerance: Option<MatchTolerance>,
}

impl NearestNeighborMatcher {
    pub fn new(
        store: Arc<ReferenceStore>,
        weights: FeatureWeights,
        labels: LabelConfig,
    ) -> PosturaResult<Self> {
        weights.validate()?;
        Ok(Self {
            store,
            weights,
            labels,
            tolerance: None,
        })
    }

    /// Reject neighbours outside `tolerance`, answering unknown instead.
    pub fn with_tolerance(mut self, tolerance: MatchTolerance) -> PosturaResult<Self> {
        tolerance.validate()?;
        self.tolerance = Some(tolerance);
        Ok(self)
    }

    pub fn tolerance(&self) -> Option<&MatchTolerance> {
        self.tolerance.as_ref()
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    /// Closest sample to `query`. Ties resolve to the earliest sample.
    ///
    /// Returns `None` for an empty store or a query with non-finite values.
    pub fn nearest(&self, query: &FeatureVector) -> Option<Neighbor<'_>> {
        let scaled = self.store.scale_query(query);
        if scaled.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut best: Option<Neighbor<'_>> = None;
        for (index, (point, label)) in self.store.points().enumerate() {
            let distance = self.weights.distance(point, &scaled);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Neighbor {
                    index,
                    label,
                    distance,
                });
            }
        }
        best
    }
}

impl PostureMatcher for NearestNeighborMatcher {
    fn classify(&self, features: &FeatureVector) -> &str {
        if self.store.is_empty() {
            return &self.labels.unknown;
        }
        let Some(neighbor) = self.nearest(features) else {
            return &self.labels.unknown;
        };
        if let Some(tolerance) = &self.tolerance {
            let sample = &self.store.samples()[neighbor.index];
            if !tolerance.accepts(features, &sample.features) {
                tracing::trace!(
                    label = neighbor.label,
                    distance = neighbor.distance,
                    "Nearest sample outside tolerance"
                );
                return &self.labels.unknown;
            }
        }
        neighbor.label
    }

    fn name(&self) -> &'static str {
        "nearest_neighbor"
    }
}
