//! Relative-height matching.
//!
//! Compares the nose height with the mean shoulder height. Image y grows
//! downwards, so a nose more than `margin` above the shoulder line reads as
//! one label, a nose within `margin` of it as another, and a nose further
//! below as a third. No reference data is needed.

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use super::{LabelConfig, PostureMatcher, LABEL_LOOKING_AHEAD, LABEL_READING, LABEL_SLOUCHED};
use crate::features::FeatureVector;

/// Default margin in normalized units: 30 px on a 480 px frame.
pub const DEFAULT_RELATIVE_MARGIN: f64 = 30.0 / 480.0;

/// Margin and labels of the relative-height rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativeHeightConfig {
    /// Half-width of the band around the mean shoulder height, in the units
    /// of the configured vertical scale.
    pub margin: f64,

    /// Nose above the band.
    pub above: String,

    /// Nose inside the band.
    pub within: String,

    /// Nose below the band.
    pub below: String,
}

impl Default for RelativeHeightConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_RELATIVE_MARGIN,
            above: LABEL_READING.to_string(),
            within: LABEL_SLOUCHED.to_string(),
            below: LABEL_LOOKING_AHEAD.to_string(),
        }
    }
}

impl RelativeHeightConfig {
    pub fn validate(&self) -> PosturaResult<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PosturaError::config(format!(
                "relative margin must be a non-negative number, got {}",
                self.margin
            )));
        }
        if [&self.above, &self.within, &self.below]
            .iter()
            .any(|label| label.trim().is_empty())
        {
            return Err(PosturaError::config("relative-height labels must not be empty"));
        }
        Ok(())
    }
}

/// Data-free matcher on nose height relative to the shoulders.
#[derive(Debug, Clone)]
pub struct RelativeHeightMatcher {
    config: RelativeHeightConfig,
    labels: LabelConfig,
}

impl RelativeHeightMatcher {
    pub fn new(config: RelativeHeightConfig, labels: LabelConfig) -> PosturaResult<Self> {
        config.validate()?;
        Ok(Self { config, labels })
    }

    pub fn config(&self) -> &RelativeHeightConfig {
        &self.config
    }
}

impl PostureMatcher for RelativeHeightMatcher {
    fn classify(&self, features: &FeatureVector) -> &str {
        let nose = features.nose_y;
        let shoulders = (features.left_shoulder_y + features.right_shoulder_y) / 2.0;
        if !nose.is_finite() || !shoulders.is_finite() {
            return &self.labels.unknown;
        }

        let margin = self.config.margin;
        if nose < shoulders - margin {
            &self.config.above
        } else if nose <= shoulders + margin {
            &self.config.within
        } else {
            &self.config.below
        }
    }

    fn name(&self) -> &'static str {
        "relative_height"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::LABEL_UNKNOWN;

    fn query(nose_y: f64, left: f64, right: f64) -> FeatureVector {
        FeatureVector {
            nose_y,
            left_shoulder_y: left,
            right_shoulder_y: right,
            ..Default::default()
        }
    }

    fn pixel_matcher() -> RelativeHeightMatcher {
        RelativeHeightMatcher::new(
            RelativeHeightConfig {
                margin: 30.0,
                ..Default::default()
            },
            LabelConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_pixel_bands_around_shoulders() {
        let m = pixel_matcher();
        // Shoulders average 250 px.
        assert_eq!(m.classify(&query(200.0, 240.0, 260.0)), LABEL_READING);
        assert_eq!(m.classify(&query(219.9, 240.0, 260.0)), LABEL_READING);
        assert_eq!(m.classify(&query(220.0, 240.0, 260.0)), LABEL_SLOUCHED);
        assert_eq!(m.classify(&query(250.0, 240.0, 260.0)), LABEL_SLOUCHED);
        assert_eq!(m.classify(&query(280.0, 240.0, 260.0)), LABEL_SLOUCHED);
        assert_eq!(m.classify(&query(280.1, 240.0, 260.0)), LABEL_LOOKING_AHEAD);
    }

    #[test]
    fn test_default_margin_in_normalized_units() {
        let m = RelativeHeightMatcher::new(RelativeHeightConfig::default(), LabelConfig::default())
            .unwrap();
        assert_eq!(m.classify(&query(0.30, 0.5, 0.5)), LABEL_READING);
        assert_eq!(m.classify(&query(0.46, 0.5, 0.5)), LABEL_SLOUCHED);
        assert_eq!(m.classify(&query(0.60, 0.5, 0.5)), LABEL_LOOKING_AHEAD);
    }

    #[test]
    fn test_non_finite_is_unknown() {
        let m = pixel_matcher();
        assert_eq!(m.classify(&query(f64::NAN, 240.0, 260.0)), LABEL_UNKNOWN);
        assert_eq!(m.classify(&query(250.0, f64::INFINITY, 260.0)), LABEL_UNKNOWN);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let negative = RelativeHeightConfig {
            margin: -1.0,
            ..Default::default()
        };
        assert!(RelativeHeightMatcher::new(negative, LabelConfig::default()).is_err());

        let blank = RelativeHeightConfig {
            within: String::new(),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        let json = r#"{ "margin": 30, "below": "Mirando al frente" }"#;
        let config: RelativeHeightConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.margin, 30.0);
        assert_eq!(config.above, LABEL_READING);
        assert_eq!(config.below, "Mirando al frente");
    }
}
