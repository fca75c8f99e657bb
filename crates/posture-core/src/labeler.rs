//! Offline heuristic labeling used to bootstrap reference datasets.

use serde::{Deserialize, Serialize};

use postura_common::error::PosturaResult;

use crate::dataset::{DatasetRow, DatasetWriter};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::landmarks::PoseFrame;
use crate::matcher::{LABEL_LOOKING_AHEAD, LABEL_READING, LABEL_SLOUCHED};

/// Labels nose height relative to both shoulders.
///
/// Image y grows downward: a nose above both shoulders (by more than
/// `margin`) is reading, below both is slouched, anything in between is
/// looking ahead. `margin` is in the units of the extractor's vertical
/// scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicLabeler {
    pub margin: f64,
    pub reading: String,
    pub slouched: String,
    pub looking_ahead: String,
}

impl Default for HeuristicLabeler {
    fn default() -> Self {
        Self {
            margin: 0.0,
            reading: LABEL_READING.to_string(),
            slouched: LABEL_SLOUCHED.to_string(),
            looking_ahead: LABEL_LOOKING_AHEAD.to_string(),
        }
    }
}

impl HeuristicLabeler {
    pub fn with_margin(margin: f64) -> Self {
        Self {
            margin,
            ..Default::default()
        }
    }

    pub fn label(&self, features: &FeatureVector) -> &str {
        let nose = features.nose_y;
        let upper = features.left_shoulder_y.min(features.right_shoulder_y);
        let lower = features.left_shoulder_y.max(features.right_shoulder_y);

        if nose < upper - self.margin {
            &self.reading
        } else if nose > lower + self.margin {
            &self.slouched
        } else {
            &self.looking_ahead
        }
    }
}

/// Outcome of labeling one frame stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelStats {
    pub frames: u64,
    pub rows_written: u64,
    pub skipped: u64,
}

impl std::ops::AddAssign for LabelStats {
    fn add_assign(&mut self, other: Self) {
        self.frames += other.frames;
        self.rows_written += other.rows_written;
        self.skipped += other.skipped;
    }
}

/// Label every detected frame of a stream and append the rows to `writer`.
///
/// Frames without a detection or with incomplete landmarks are skipped.
/// Features are taken raw, without smoothing.
pub fn label_stream<'a>(
    source_name: &str,
    frames: impl IntoIterator<Item = &'a PoseFrame>,
    extractor: &FeatureExtractor,
    labeler: &HeuristicLabeler,
    writer: &mut DatasetWriter,
) -> PosturaResult<LabelStats> {
    let mut stats = LabelStats::default();

    for frame in frames {
        stats.frames += 1;

        let Some(landmarks) = frame.landmarks.as_ref() else {
            stats.skipped += 1;
            continue;
        };

        let features = match extractor.extract(landmarks) {
            Ok(features) => features,
            Err(e) if e.is_frame_local() => {
                tracing::debug!(
                    source = source_name,
                    frame = frame.frame,
                    error = %e,
                    "Skipping frame"
                );
                stats.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let row = DatasetRow::new(&features, labeler.label(&features))
            .with_provenance(source_name, frame.frame);
        writer.write_row(&row)?;
        stats.rows_written += 1;
    }

    tracing::info!(
        source = source_name,
        frames = stats.frames,
        rows = stats.rows_written,
        skipped = stats.skipped,
        "Labeled frame stream"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{BodyLandmark, Landmark, LandmarkSet};
    use crate::reference::ReferenceStore;

    fn features(nose_y: f64, left: f64, right: f64) -> FeatureVector {
        FeatureVector {
            nose_y,
            left_shoulder_y: left,
            right_shoulder_y: right,
            ..Default::default()
        }
    }

    #[test]
    fn test_nose_against_both_shoulders() {
        let labeler = HeuristicLabeler::default();
        assert_eq!(labeler.label(&features(0.3, 0.5, 0.52)), LABEL_READING);
        assert_eq!(labeler.label(&features(0.6, 0.5, 0.52)), LABEL_SLOUCHED);
        assert_eq!(labeler.label(&features(0.51, 0.5, 0.52)), LABEL_LOOKING_AHEAD);
        // Touching a shoulder counts as between.
        assert_eq!(labeler.label(&features(0.5, 0.5, 0.52)), LABEL_LOOKING_AHEAD);
    }

    #[test]
    fn test_margin_widens_middle_band() {
        let labeler = HeuristicLabeler::with_margin(0.1);
        assert_eq!(labeler.label(&features(0.45, 0.5, 0.5)), LABEL_LOOKING_AHEAD);
        assert_eq!(labeler.label(&features(0.35, 0.5, 0.5)), LABEL_READING);
        assert_eq!(labeler.label(&features(0.65, 0.5, 0.5)), LABEL_SLOUCHED);
    }

    fn pose(nose_y: f64) -> LandmarkSet {
        let mut set = LandmarkSet::default();
        set.set(BodyLandmark::Nose, Landmark::new(0.5, nose_y));
        set.set(BodyLandmark::LeftShoulder, Landmark::new(0.6, 0.5));
        set.set(BodyLandmark::RightShoulder, Landmark::new(0.4, 0.55));
        set.set(BodyLandmark::LeftHip, Landmark::new(0.6, 0.9));
        set.set(BodyLandmark::RightHip, Landmark::new(0.4, 0.92));
        set
    }

    #[test]
    fn test_label_stream_writes_loadable_dataset() {
        let dir = std::env::temp_dir().join("postura_test_labeler");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labels.csv");

        let mut partial = LandmarkSet::default();
        partial.set(BodyLandmark::Nose, Landmark::new(0.5, 0.3));
        let frames = vec![
            PoseFrame::detected(0, pose(0.3)),
            PoseFrame::empty(1),
            PoseFrame::detected(2, partial),
            PoseFrame::detected(3, pose(0.7)),
            PoseFrame::detected(4, pose(0.52)),
        ];

        let stats = {
            let mut writer = DatasetWriter::create(&path).unwrap();
            label_stream(
                "clip.jsonl",
                &frames,
                &FeatureExtractor::default(),
                &HeuristicLabeler::default(),
                &mut writer,
            )
            .unwrap()
        };
        assert_eq!(
            stats,
            LabelStats {
                frames: 5,
                rows_written: 3,
                skipped: 2,
            }
        );

        let store = ReferenceStore::load_csv(&path, false).unwrap();
        let labels: Vec<_> = store.samples().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec![LABEL_READING, LABEL_SLOUCHED, LABEL_LOOKING_AHEAD]);
        let provenance = store.samples()[1].provenance.as_ref().unwrap();
        assert_eq!(provenance.video, "clip.jsonl");
        assert_eq!(provenance.frame, Some(3));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = LabelStats::default();
        total += LabelStats {
            frames: 2,
            rows_written: 1,
            skipped: 1,
        };
        total += LabelStats {
            frames: 3,
            rows_written: 3,
            skipped: 0,
        };
        assert_eq!(total.rows_written, 4);
        assert_eq!(total.frames, 5);
    }
}
