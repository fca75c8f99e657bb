//! Classifier configuration.

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use crate::features::{AngleMode, VerticalScale};
use crate::matcher::bands::{default_rules, validate_rules, BandRule, DEFAULT_LATERAL_OFFSET};
use crate::matcher::{
    FeatureWeights, LabelConfig, MatchStrategy, MatchTolerance, RelativeHeightConfig,
};
use crate::smoothing::DEFAULT_HISTORY_SIZE;

/// Every tunable of the classification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Frames averaged per feature by the temporal smoother.
    pub history_size: usize,

    /// Matching strategy.
    pub strategy: MatchStrategy,

    /// Min/max normalize reference data and queries (nearest neighbour only).
    pub normalize: bool,

    /// How neck and torso angles are computed.
    pub angle_mode: AngleMode,

    /// Units of the vertical position features. Must match the reference data.
    pub vertical_scale: VerticalScale,

    /// Distance weights for nearest-neighbour matching.
    pub weights: FeatureWeights,

    /// Per-feature limits on the nearest neighbour; unset accepts any match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<MatchTolerance>,

    /// Ordered band table for threshold matching; earlier rules win.
    pub bands: Vec<BandRule>,

    /// Nose-to-hip horizontal offset that triggers the looking-sideways label.
    pub lateral_offset: f64,

    /// Margin and labels for relative-height matching.
    pub relative: RelativeHeightConfig,

    /// Fallback labels.
    pub labels: LabelConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            strategy: MatchStrategy::default(),
            normalize: true,
            angle_mode: AngleMode::default(),
            vertical_scale: VerticalScale::default(),
            weights: FeatureWeights::default(),
            tolerance: None,
            bands: default_rules(),
            lateral_offset: DEFAULT_LATERAL_OFFSET,
            relative: RelativeHeightConfig::default(),
            labels: LabelConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> PosturaResult<()> {
        if self.history_size == 0 {
            return Err(PosturaError::config("history_size must be at least 1"));
        }

        if let VerticalScale::Pixels { frame_height } = self.vertical_scale {
            if !frame_height.is_finite() || frame_height <= 0.0 {
                return Err(PosturaError::config(format!(
                    "frame_height must be positive, got {frame_height}"
                )));
            }
        }

        if self.labels.unknown.trim().is_empty() || self.labels.looking_sideways.trim().is_empty()
        {
            return Err(PosturaError::config("fallback labels must not be empty"));
        }

        if !self.lateral_offset.is_finite() || self.lateral_offset < 0.0 {
            return Err(PosturaError::config(format!(
                "lateral_offset must be a non-negative number, got {}",
                self.lateral_offset
            )));
        }

        self.weights.validate()?;
        if let Some(tolerance) = &self.tolerance {
            tolerance.validate()?;
        }
        validate_rules(&self.bands)?;
        self.relative.validate()?;

        if let Some(rule) = self
            .bands
            .iter()
            .find(|r| r.label == self.labels.unknown || r.label == self.labels.looking_sideways)
        {
            return Err(PosturaError::config(format!(
                "band label '{}' collides with a fallback label",
                rule.label
            )));
        }

        Ok(())
    }

    /// Valid but suspicious settings, as human-readable messages.
    ///
    /// Position thresholds are in the units of `vertical_scale`. Under the
    /// pixel scale, thresholds that all fit inside `[0, 1]` were almost
    /// certainly written for normalized coordinates.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let VerticalScale::Pixels { frame_height } = self.vertical_scale else {
            return warnings;
        };

        match self.strategy {
            MatchStrategy::ThresholdBands => {
                let normalized_bands = !self.bands.is_empty()
                    && self.bands.iter().all(|rule| {
                        [rule.nose_y, rule.left_shoulder_y, rule.right_shoulder_y]
                            .iter()
                            .all(|band| band.high <= 1.0)
                    });
                if normalized_bands {
                    warnings.push(format!(
                        "vertical scale is pixels (frame height {frame_height}) but every \
                         position band lies within [0, 1]; bands look normalized"
                    ));
                }
            }
            MatchStrategy::RelativeHeight if self.relative.margin < 1.0 => {
                warnings.push(format!(
                    "vertical scale is pixels (frame height {frame_height}) but the relative \
                     margin is {}; the margin looks normalized",
                    self.relative.margin
                ));
            }
            MatchStrategy::NearestNeighbor => {
                if let Some(tolerance) = self.tolerance.filter(|t| t.positions < 1.0) {
                    warnings.push(format!(
                        "vertical scale is pixels (frame height {frame_height}) but the position \
                         tolerance is {}; the tolerance looks normalized",
                        tolerance.positions
                    ));
                }
            }
            _ => {}
        }

        warnings
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(content: &str) -> PosturaResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
