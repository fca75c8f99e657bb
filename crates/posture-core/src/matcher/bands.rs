//! Threshold-band matching.
//!
//! Each rule names a label and a closed interval per reference feature. The
//! rules are evaluated in configuration order and the first rule whose
//! intervals all contain the query wins. If none match, a large horizontal
//! nose-to-hip offset is read as the person looking sideways.

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use super::{LabelConfig, PostureMatcher, LABEL_LOOKING_AHEAD, LABEL_READING, LABEL_SLOUCHED};
use crate::features::{Feature, FeatureVector};

/// Default nose-to-hip horizontal offset above which an unmatched frame is
/// labelled as looking sideways.
pub const DEFAULT_LATERAL_OFFSET: f64 = 0.05;

/// Closed interval `[low, high]`, written as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn overlaps(&self, other: &Band) -> bool {
        self.low <= other.high && other.low <= self.high
    }

    fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

impl From<[f64; 2]> for Band {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<Band> for [f64; 2] {
    fn from(band: Band) -> Self {
        [band.low, band.high]
    }
}

/// Feature intervals that identify one posture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRule {
    pub label: String,
    pub nose_y: Band,
    pub left_shoulder_y: Band,
    pub right_shoulder_y: Band,
    pub neck_angle_deg: Band,
    pub torso_angle_deg: Band,
}

impl BandRule {
    /// Interval for a reference feature. The lateral offset has no band and
    /// accepts everything.
    pub fn band(&self, feature: Feature) -> Band {
        match feature {
            Feature::NoseY => self.nose_y,
            Feature::LeftShoulderY => self.left_shoulder_y,
            Feature::RightShoulderY => self.right_shoulder_y,
            Feature::NeckAngle => self.neck_angle_deg,
            Feature::TorsoAngle => self.torso_angle_deg,
            Feature::NoseHipXOffset => Band::new(f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    pub fn matches(&self, features: &FeatureVector) -> bool {
        Feature::REFERENCE
            .iter()
            .all(|f| self.band(*f).contains(features.get(*f)))
    }

    /// Whether some feature vector satisfies both rules.
    pub fn overlaps(&self, other: &BandRule) -> bool {
        Feature::REFERENCE
            .iter()
            .all(|f| self.band(*f).overlaps(&other.band(*f)))
    }
}

/// Starting band table for normalized coordinates and geometric angles.
/// Overlapping regions resolve in list order, so slouching is checked first.
pub fn default_rules() -> Vec<BandRule> {
    vec![
        BandRule {
            label: LABEL_SLOUCHED.to_string(),
            nose_y: Band::new(0.40, 0.80),
            left_shoulder_y: Band::new(0.50, 0.95),
            right_shoulder_y: Band::new(0.50, 0.95),
            neck_angle_deg: Band::new(0.0, 60.0),
            torso_angle_deg: Band::new(0.0, 80.0),
        },
        BandRule {
            label: LABEL_READING.to_string(),
            nose_y: Band::new(0.25, 0.60),
            left_shoulder_y: Band::new(0.45, 0.85),
            right_shoulder_y: Band::new(0.45, 0.85),
            neck_angle_deg: Band::new(55.0, 80.0),
            torso_angle_deg: Band::new(70.0, 90.0),
        },
        BandRule {
            label: LABEL_LOOKING_AHEAD.to_string(),
            nose_y: Band::new(0.05, 0.45),
            left_shoulder_y: Band::new(0.30, 0.75),
            right_shoulder_y: Band::new(0.30, 0.75),
            neck_angle_deg: Band::new(75.0, 90.0),
            torso_angle_deg: Band::new(75.0, 90.0),
        },
    ]
}

/// Check a rule table: non-empty unique labels and well-formed intervals.
pub fn validate_rules(rules: &[BandRule]) -> PosturaResult<()> {
    for (i, rule) in rules.iter().enumerate() {
        if rule.label.trim().is_empty() {
            return Err(PosturaError::config(format!("band rule {i} has an empty label")));
        }
        if rules[..i].iter().any(|r| r.label == rule.label) {
            return Err(PosturaError::config(format!(
                "band label '{}' is defined more than once",
                rule.label
            )));
        }
        for feature in Feature::REFERENCE {
            let band = rule.band(feature);
            if !band.is_valid() {
                return Err(PosturaError::config(format!(
                    "band '{}' for {} is not a valid interval: [{}, {}]",
                    rule.label,
                    feature.column(),
                    band.low,
                    band.high
                )));
            }
        }
    }
    Ok(())
}

/// Data-free matcher over an ordered band table.
#[derive(Debug, Clone)]
pub struct ThresholdMatcher {
    rules: Vec<BandRule>,
    lateral_offset: f64,
    labels: LabelConfig,
}

impl ThresholdMatcher {
    pub fn new(
        rules: Vec<BandRule>,
        lateral_offset: f64,
        labels: LabelConfig,
    ) -> PosturaResult<Self> {
        validate_rules(&rules)?;
        if !lateral_offset.is_finite() || lateral_offset < 0.0 {
            return Err(PosturaError::config(format!(
                "lateral offset must be a non-negative number, got {lateral_offset}"
            )));
        }

        for (i, rule) in rules.iter().enumerate() {
            for later in &rules[i + 1..] {
                if rule.overlaps(later) {
                    tracing::debug!(
                        first = %rule.label,
                        second = %later.label,
                        "Band rules overlap; the first listed takes precedence"
                    );
                }
            }
        }

        Ok(Self {
            rules,
            lateral_offset,
            labels,
        })
    }

    pub fn rules(&self) -> &[BandRule] {
        &self.rules
    }

    pub fn lateral_offset(&self) -> f64 {
        self.lateral_offset
    }

    /// Index of the first rule matching `features`.
    pub fn matching_rule(&self, features: &FeatureVector) -> Option<usize> {
        self.rules.iter().position(|rule| rule.matches(features))
    }
}

impl PostureMatcher for ThresholdMatcher {
    fn classify(&self, features: &FeatureVector) -> &str {
        if let Some(i) = self.matching_rule(features) {
            return &self.rules[i].label;
        }
        if features.nose_hip_x_offset >= self.lateral_offset {
            &self.labels.looking_sideways
        } else {
            &self.labels.unknown
        }
    }

    fn name(&self) -> &'static str {
        "threshold_bands"
    }
}
