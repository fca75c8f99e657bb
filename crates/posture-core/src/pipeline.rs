//! Per-session classification pipeline.
//!
//! A [`PostureClassifier`] is the explicitly constructed context for one
//! capture session: it owns the feature extractor, the smoothing windows,
//! and the selected matcher. Frames are processed strictly in order, one
//! extract/smooth/match cycle per frame.

use std::sync::Arc;

use serde::Serialize;

use postura_common::error::{PosturaError, PosturaResult};

use crate::config::ClassifierConfig;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::landmarks::PoseFrame;
use crate::matcher::{
    MatchStrategy, NearestNeighborMatcher, PostureMatcher, RelativeHeightMatcher,
    ThresholdMatcher,
};
use crate::reference::ReferenceStore;
use crate::smoothing::TemporalSmoother;

/// Label assigned to one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub frame: u64,
    pub label: String,
    /// Smoothed features the label was derived from.
    pub features: FeatureVector,
}

/// Frame counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_seen: u64,
    pub frames_classified: u64,
    /// Frames without a detection or with incomplete landmarks.
    pub frames_skipped: u64,
}

/// Extractor, smoother, and matcher for one capture session.
pub struct PostureClassifier {
    extractor: FeatureExtractor,
    smoother: TemporalSmoother,
    matcher: Box<dyn PostureMatcher>,
    stats: SessionStats,
}

impl PostureClassifier {
    /// Assemble a classifier from explicit parts.
    pub fn new(
        extractor: FeatureExtractor,
        smoother: TemporalSmoother,
        matcher: Box<dyn PostureMatcher>,
    ) -> Self {
        Self {
            extractor,
            smoother,
            matcher,
            stats: SessionStats::default(),
        }
    }

    /// Build a classifier from validated configuration.
    ///
    /// The nearest-neighbour strategy requires a reference store; passing
    /// [`ReferenceStore::empty`] is accepted and yields the unknown label on
    /// every frame.
    pub fn from_config(
        config: &ClassifierConfig,
        store: Option<Arc<ReferenceStore>>,
    ) -> PosturaResult<Self> {
        config.validate()?;
        for warning in config.warnings() {
            tracing::warn!("{warning}");
        }

        let matcher: Box<dyn PostureMatcher> = match config.strategy {
            MatchStrategy::NearestNeighbor => {
                let store = store.ok_or_else(|| {
                    PosturaError::config("nearest-neighbour matching requires a reference dataset")
                })?;
                if store.is_normalized() != config.normalize && !store.is_empty() {
                    tracing::warn!(
                        store_normalized = store.is_normalized(),
                        config_normalize = config.normalize,
                        "Reference store normalization differs from configuration"
                    );
                }
                let matcher =
                    NearestNeighborMatcher::new(store, config.weights, config.labels.clone())?;
                match config.tolerance {
                    Some(tolerance) => Box::new(matcher.with_tolerance(tolerance)?),
                    None => Box::new(matcher),
                }
            }
            MatchStrategy::ThresholdBands => Box::new(ThresholdMatcher::new(
                config.bands.clone(),
                config.lateral_offset,
                config.labels.clone(),
            )?),
            MatchStrategy::RelativeHeight => Box::new(RelativeHeightMatcher::new(
                config.relative.clone(),
                config.labels.clone(),
            )?),
        };

        tracing::debug!(
            strategy = matcher.name(),
            history_size = config.history_size,
            angle_mode = ?config.angle_mode,
            vertical_scale = ?config.vertical_scale,
            "Classifier ready"
        );

        Ok(Self::new(
            FeatureExtractor::new(config.angle_mode, config.vertical_scale),
            TemporalSmoother::new(config.history_size),
            matcher,
        ))
    }

    /// Run one frame through the pipeline. Frames without a usable
    /// detection produce no classification and leave the smoother untouched.
    pub fn process(&mut self, frame: &PoseFrame) -> Option<Classification> {
        self.stats.frames_seen += 1;

        let Some(landmarks) = frame.landmarks.as_ref() else {
            self.stats.frames_skipped += 1;
            return None;
        };

        let raw = match self.extractor.extract(landmarks) {
            Ok(features) => features,
            Err(e) => {
                tracing::debug!(frame = frame.frame, error = %e, "Skipping frame");
                self.stats.frames_skipped += 1;
                return None;
            }
        };

        let features = self.smoother.observe(raw);
        let label = self.matcher.classify(&features).to_string();
        self.stats.frames_classified += 1;

        Some(Classification {
            frame: frame.frame,
            label,
            features,
        })
    }

    /// Process a sequence of frames, returning classifications in order.
    pub fn process_all<'a>(
        &mut self,
        frames: impl IntoIterator<Item = &'a PoseFrame>,
    ) -> Vec<Classification> {
        frames
            .into_iter()
            .filter_map(|frame| self.process(frame))
            .collect()
    }

    /// Classify an already extracted feature vector without smoothing.
    pub fn classify_features(&self, features: &FeatureVector) -> &str {
        self.matcher.classify(features)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn strategy_name(&self) -> &'static str {
        self.matcher.name()
    }

    pub fn smoother(&self) -> &TemporalSmoother {
        &self.smoother
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{BodyLandmark, Landmark, LandmarkSet};
    use crate::matcher::{MatchTolerance, LABEL_LOOKING_SIDEWAYS, LABEL_UNKNOWN};
    use crate::reference::ReferenceSample;

    fn pose(nose: (f64, f64)) -> LandmarkSet {
        let mut set = LandmarkSet::default();
        set.set(BodyLandmark::Nose, Landmark::new(nose.0, nose.1));
        set.set(BodyLandmark::LeftShoulder, Landmark::new(0.6, 0.5));
        set.set(BodyLandmark::RightShoulder, Landmark::new(0.4, 0.5));
        set.set(BodyLandmark::LeftHip, Landmark::new(0.6, 0.9));
        set.set(BodyLandmark::RightHip, Landmark::new(0.4, 0.9));
        set
    }

    fn bands_config() -> ClassifierConfig {
        ClassifierConfig {
            strategy: MatchStrategy::ThresholdBands,
            ..Default::default()
        }
    }

    #[test]
    fn test_frames_without_detection_are_skipped() {
        let mut classifier = PostureClassifier::from_config(&bands_config(), None).unwrap();
        assert!(classifier.process(&PoseFrame::empty(0)).is_none());

        let mut partial = LandmarkSet::default();
        partial.set(BodyLandmark::Nose, Landmark::new(0.5, 0.3));
        assert!(classifier
            .process(&PoseFrame::detected(1, partial))
            .is_none());

        let stats = classifier.stats();
        assert_eq!(stats.frames_seen, 2);
        assert_eq!(stats.frames_skipped, 2);
        assert_eq!(stats.frames_classified, 0);
        assert!(classifier.smoother().is_empty());
    }

    #[test]
    fn test_threshold_pipeline_labels_each_frame() {
        let mut classifier = PostureClassifier::from_config(&bands_config(), None).unwrap();
        // Upright, nose centred well above the shoulders.
        let result = classifier
            .process(&PoseFrame::detected(7, pose((0.5, 0.3))))
            .unwrap();
        assert_eq!(result.frame, 7);
        assert_eq!(result.label, "Mirando");
        assert!((result.features.neck_angle_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_lateral_gaze_through_pipeline() {
        let mut classifier = PostureClassifier::from_config(&bands_config(), None).unwrap();
        // Head turned far to one side: no band matches, large offset.
        let result = classifier
            .process(&PoseFrame::detected(0, pose((0.9, 0.45))))
            .unwrap();
        assert_eq!(result.label, LABEL_LOOKING_SIDEWAYS);
    }

    #[test]
    fn test_smoothing_damps_single_outlier() {
        let config = ClassifierConfig {
            strategy: MatchStrategy::ThresholdBands,
            history_size: 5,
            ..Default::default()
        };
        let mut classifier = PostureClassifier::from_config(&config, None).unwrap();
        for i in 0..4 {
            classifier.process(&PoseFrame::detected(i, pose((0.5, 0.3))));
        }
        let result = classifier
            .process(&PoseFrame::detected(4, pose((0.5, 0.9))))
            .unwrap();
        // Mean nose height (0.3 * 4 + 0.9) / 5 = 0.42.
        assert!((result.features.nose_y - 0.42).abs() < 1e-9);
        assert_eq!(classifier.smoother().len(), 5);
    }

    #[test]
    fn test_nearest_neighbor_requires_store() {
        let err = PostureClassifier::from_config(&ClassifierConfig::default(), None)
            .err()
            .unwrap();
        assert!(matches!(err, PosturaError::Config { .. }));
    }

    #[test]
    fn test_empty_store_yields_unknown() {
        let mut classifier = PostureClassifier::from_config(
            &ClassifierConfig::default(),
            Some(Arc::new(ReferenceStore::empty())),
        )
        .unwrap();
        let result = classifier
            .process(&PoseFrame::detected(0, pose((0.5, 0.3))))
            .unwrap();
        assert_eq!(result.label, LABEL_UNKNOWN);
        assert_eq!(classifier.strategy_name(), "nearest_neighbor");
    }

    #[test]
    fn test_nearest_neighbor_pipeline() {
        let extractor = FeatureExtractor::default();
        let reading = extractor.extract(&pose((0.5, 0.3))).unwrap();
        let slouched = extractor.extract(&pose((0.52, 0.46))).unwrap();
        let store = ReferenceStore::from_samples(
            vec![
                ReferenceSample::new(reading, "Leyendo"),
                ReferenceSample::new(slouched, "Encorvado"),
            ],
            false,
        )
        .unwrap();
        let config = ClassifierConfig {
            history_size: 1,
            normalize: false,
            ..Default::default()
        };
        let mut classifier =
            PostureClassifier::from_config(&config, Some(Arc::new(store))).unwrap();

        let frames = vec![
            PoseFrame::detected(0, pose((0.5, 0.31))),
            PoseFrame::empty(1),
            PoseFrame::detected(2, pose((0.52, 0.45))),
        ];
        let labels: Vec<_> = classifier
            .process_all(&frames)
            .into_iter()
            .map(|c| (c.frame, c.label))
            .collect();
        assert_eq!(
            labels,
            vec![(0, "Leyendo".to_string()), (2, "Encorvado".to_string())]
        );
    }

    #[test]
    fn test_relative_height_pipeline() {
        let config = ClassifierConfig {
            strategy: MatchStrategy::RelativeHeight,
            history_size: 1,
            ..Default::default()
        };
        let mut classifier = PostureClassifier::from_config(&config, None).unwrap();
        assert_eq!(classifier.strategy_name(), "relative_height");

        // Shoulders sit at 0.5.
        let frames = vec![
            PoseFrame::detected(0, pose((0.5, 0.3))),
            PoseFrame::detected(1, pose((0.5, 0.48))),
            PoseFrame::detected(2, pose((0.5, 0.7))),
        ];
        let labels: Vec<_> = classifier
            .process_all(&frames)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["Leyendo", "Encorvado", "Mirando"]);
    }

    #[test]
    fn test_tolerance_limits_nearest_neighbor() {
        let reading = FeatureExtractor::default().extract(&pose((0.5, 0.3))).unwrap();
        let store =
            ReferenceStore::from_samples(vec![ReferenceSample::new(reading, "Leyendo")], false)
                .unwrap();
        let config = ClassifierConfig {
            history_size: 1,
            normalize: false,
            tolerance: Some(MatchTolerance::default()),
            ..Default::default()
        };
        let mut classifier =
            PostureClassifier::from_config(&config, Some(Arc::new(store))).unwrap();

        let close = classifier
            .process(&PoseFrame::detected(0, pose((0.5, 0.31))))
            .unwrap();
        assert_eq!(close.label, "Leyendo");
        let far = classifier
            .process(&PoseFrame::detected(1, pose((0.5, 0.4))))
            .unwrap();
        assert_eq!(far.label, LABEL_UNKNOWN);
    }
}
