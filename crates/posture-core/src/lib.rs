//! Postura Core: posture classification.
//!
//! Turns per-frame body landmarks into posture labels:
//! - **Features:** Nose/shoulder heights, neck and torso angles, lateral offset
//! - **Smoothing:** Fixed-length moving average per feature
//! - **Matching:** Weighted nearest neighbour over a reference dataset,
//!   ordered threshold bands with a lateral-gaze override, or nose height
//!   relative to the shoulders
//! - **Labeling:** Heuristic bootstrap of reference datasets from frame streams
//!
//! Pose estimation itself happens upstream; this crate consumes landmark
//! coordinates normalized to the `[0.0, 1.0]` image range.

pub mod config;
pub mod dataset;
pub mod features;
pub mod labeler;
pub mod landmarks;
pub mod matcher;
pub mod pipeline;
pub mod reference;
pub mod smoothing;
pub mod stream;

pub use config::ClassifierConfig;
pub use dataset::{DatasetRow, DatasetWriter};
pub use features::{AngleMode, Feature, FeatureExtractor, FeatureVector, VerticalScale};
pub use labeler::{label_stream, HeuristicLabeler, LabelStats};
pub use landmarks::{BodyLandmark, Landmark, LandmarkSet, PoseFrame};
pub use matcher::{
    MatchStrategy, MatchTolerance, NearestNeighborMatcher, PostureMatcher, RelativeHeightMatcher,
    ThresholdMatcher,
};
pub use pipeline::{Classification, PostureClassifier, SessionStats};
pub use reference::{ReferenceSample, ReferenceStore};
pub use smoothing::TemporalSmoother;
pub use stream::{read_frame_stream, FrameStream, FrameStreamHeader};
