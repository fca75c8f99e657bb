//! Feature extraction: landmarks to a fixed posture feature vector.

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use crate::landmarks::{BodyLandmark, Landmark, LandmarkSet};

/// Landmarks that must be present for extraction to succeed.
pub const REQUIRED_LANDMARKS: [BodyLandmark; 5] = [
    BodyLandmark::Nose,
    BodyLandmark::LeftShoulder,
    BodyLandmark::RightShoulder,
    BodyLandmark::LeftHip,
    BodyLandmark::RightHip,
];

/// Derived posture measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub nose_y: f64,
    pub left_shoulder_y: f64,
    pub right_shoulder_y: f64,
    pub neck_angle_deg: f64,
    pub torso_angle_deg: f64,
    pub nose_hip_x_offset: f64,
}

/// Named fields of a [`FeatureVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    NoseY,
    LeftShoulderY,
    RightShoulderY,
    NeckAngle,
    TorsoAngle,
    NoseHipXOffset,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::NoseY,
        Feature::LeftShoulderY,
        Feature::RightShoulderY,
        Feature::NeckAngle,
        Feature::TorsoAngle,
        Feature::NoseHipXOffset,
    ];

    /// Features stored in reference datasets and compared by matchers.
    pub const REFERENCE: [Feature; 5] = [
        Feature::NoseY,
        Feature::LeftShoulderY,
        Feature::RightShoulderY,
        Feature::NeckAngle,
        Feature::TorsoAngle,
    ];

    /// Position of this feature in [`Feature::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column header used in reference datasets.
    pub fn column(self) -> &'static str {
        match self {
            Feature::NoseY => "Nose_Y",
            Feature::LeftShoulderY => "Left_Shoulder_Y",
            Feature::RightShoulderY => "Right_Shoulder_Y",
            Feature::NeckAngle => "Neck_Angle",
            Feature::TorsoAngle => "Torso_Angle",
            Feature::NoseHipXOffset => "Nose_Hip_X_Offset",
        }
    }
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::NoseY => self.nose_y,
            Feature::LeftShoulderY => self.left_shoulder_y,
            Feature::RightShoulderY => self.right_shoulder_y,
            Feature::NeckAngle => self.neck_angle_deg,
            Feature::TorsoAngle => self.torso_angle_deg,
            Feature::NoseHipXOffset => self.nose_hip_x_offset,
        }
    }

    /// Build a vector by evaluating `f` for every feature.
    pub fn from_fn(mut f: impl FnMut(Feature) -> f64) -> Self {
        Self {
            nose_y: f(Feature::NoseY),
            left_shoulder_y: f(Feature::LeftShoulderY),
            right_shoulder_y: f(Feature::RightShoulderY),
            neck_angle_deg: f(Feature::NeckAngle),
            torso_angle_deg: f(Feature::TorsoAngle),
            nose_hip_x_offset: f(Feature::NoseHipXOffset),
        }
    }

    /// The five reference features in [`Feature::REFERENCE`] order.
    pub fn reference_values(&self) -> [f64; 5] {
        Feature::REFERENCE.map(|feature| self.get(feature))
    }
}

/// How neck and torso angles are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleMode {
    /// Angle of the segment from horizontal, in degrees.
    #[default]
    Geometric,
    /// Left/right height difference scaled by 100.
    Simplified,
}

/// Units for the vertical position features.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerticalScale {
    /// Normalized image coordinates in `[0, 1]`.
    #[default]
    Normalized,
    /// Pixel rows, using the frame height of the capture source.
    Pixels { frame_height: f64 },
}

impl VerticalScale {
    fn apply(self, y: f64) -> f64 {
        match self {
            VerticalScale::Normalized => y,
            VerticalScale::Pixels { frame_height } => y * frame_height,
        }
    }
}

/// Converts landmark sets into feature vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    angle_mode: AngleMode,
    vertical_scale: VerticalScale,
}

impl FeatureExtractor {
    pub fn new(angle_mode: AngleMode, vertical_scale: VerticalScale) -> Self {
        Self {
            angle_mode,
            vertical_scale,
        }
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.angle_mode
    }

    pub fn vertical_scale(&self) -> VerticalScale {
        self.vertical_scale
    }

    /// Derive the feature vector for one frame.
    pub fn extract(&self, landmarks: &LandmarkSet) -> PosturaResult<FeatureVector> {
        let [nose, left_shoulder, right_shoulder, left_hip, right_hip] =
            REQUIRED_LANDMARKS.map(|part| landmarks.get(part));
        let (Some(nose), Some(ls), Some(rs), Some(lh), Some(rh)) =
            (nose, left_shoulder, right_shoulder, left_hip, right_hip)
        else {
            let missing = REQUIRED_LANDMARKS
                .iter()
                .find(|part| landmarks.get(**part).is_none())
                .map(|part| part.name())
                .unwrap_or("unknown");
            return Err(PosturaError::missing_landmark(missing));
        };

        let shoulder_mid = ls.midpoint(rs);
        let hip_mid = lh.midpoint(rh);

        let (neck_angle_deg, torso_angle_deg) = match self.angle_mode {
            AngleMode::Geometric => (
                segment_angle_deg(nose, &shoulder_mid),
                segment_angle_deg(&shoulder_mid, &hip_mid),
            ),
            AngleMode::Simplified => ((ls.y - rs.y).abs() * 100.0, (lh.y - rh.y).abs() * 100.0),
        };

        Ok(FeatureVector {
            nose_y: self.vertical_scale.apply(nose.y),
            left_shoulder_y: self.vertical_scale.apply(ls.y),
            right_shoulder_y: self.vertical_scale.apply(rs.y),
            neck_angle_deg,
            torso_angle_deg,
            nose_hip_x_offset: (nose.x - hip_mid.x).abs(),
        })
    }
}

/// Absolute angle of the segment `from -> to` relative to horizontal.
fn segment_angle_deg(from: &Landmark, to: &Landmark) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).abs().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated_pose() -> LandmarkSet {
        let mut set = LandmarkSet::default();
        set.set(BodyLandmark::Nose, Landmark::new(0.5, 0.3));
        set.set(BodyLandmark::LeftShoulder, Landmark::new(0.6, 0.5));
        set.set(BodyLandmark::RightShoulder, Landmark::new(0.4, 0.52));
        set.set(BodyLandmark::LeftHip, Landmark::new(0.58, 0.9));
        set.set(BodyLandmark::RightHip, Landmark::new(0.42, 0.93));
        set
    }

    #[test]
    fn test_geometric_features() {
        let features = FeatureExtractor::default().extract(&seated_pose()).unwrap();
        assert_eq!(features.nose_y, 0.3);
        assert_eq!(features.left_shoulder_y, 0.5);
        assert_eq!(features.right_shoulder_y, 0.52);
        // Shoulder midpoint sits straight below the nose.
        assert!((features.neck_angle_deg - 90.0).abs() < 1e-9);
        assert!((features.torso_angle_deg - 90.0).abs() < 1e-9);
        assert!(features.nose_hip_x_offset.abs() < 1e-12);
    }

    #[test]
    fn test_geometric_angle_of_diagonal_segment() {
        let mut set = seated_pose();
        set.set(BodyLandmark::Nose, Landmark::new(0.39, 0.4));
        let features = FeatureExtractor::default().extract(&set).unwrap();
        // Shoulder midpoint (0.5, 0.51) is 0.11 right and 0.11 below the nose.
        assert!((features.neck_angle_deg - 45.0).abs() < 1e-9);
        assert!((features.nose_hip_x_offset - 0.11).abs() < 1e-12);
    }

    #[test]
    fn test_simplified_angles() {
        let extractor = FeatureExtractor::new(AngleMode::Simplified, VerticalScale::Normalized);
        let features = extractor.extract(&seated_pose()).unwrap();
        assert!((features.neck_angle_deg - 2.0).abs() < 1e-9);
        assert!((features.torso_angle_deg - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_scale_only_affects_vertical_positions() {
        let extractor = FeatureExtractor::new(
            AngleMode::Geometric,
            VerticalScale::Pixels {
                frame_height: 480.0,
            },
        );
        let features = extractor.extract(&seated_pose()).unwrap();
        assert!((features.nose_y - 144.0).abs() < 1e-9);
        assert!((features.left_shoulder_y - 240.0).abs() < 1e-9);
        assert!((features.neck_angle_deg - 90.0).abs() < 1e-9);
        assert!(features.nose_hip_x_offset.abs() < 1e-12);
    }

    #[test]
    fn test_missing_landmarks() {
        let mut set = LandmarkSet::default();
        set.set(BodyLandmark::Nose, Landmark::new(0.5, 0.3));
        set.set(BodyLandmark::RightShoulder, Landmark::new(0.4, 0.5));

        let err = FeatureExtractor::default().extract(&set).unwrap_err();
        match err {
            PosturaError::MissingLandmarks { landmark } => assert_eq!(landmark, "left_shoulder"),
            other => panic!("unexpected error: {other}"),
        }

        let err = FeatureExtractor::default()
            .extract(&LandmarkSet::default())
            .unwrap_err();
        assert!(err.is_frame_local());
    }

    #[test]
    fn test_gap_before_set_point_is_missing() {
        let mut set = LandmarkSet::default();
        set.set(BodyLandmark::Nose, Landmark::new(0.5, 0.3));
        set.set(BodyLandmark::RightShoulder, Landmark::new(0.4, 0.5));
        set.set(BodyLandmark::LeftHip, Landmark::new(0.55, 0.9));
        set.set(BodyLandmark::RightHip, Landmark::new(0.45, 0.9));

        // The left shoulder slot sits between points that were set.
        assert!(set.get(BodyLandmark::LeftShoulder).is_none());
        let err = FeatureExtractor::default().extract(&set).unwrap_err();
        match err {
            PosturaError::MissingLandmarks { landmark } => assert_eq!(landmark, "left_shoulder"),
            other => panic!("unexpected error: {other}"),
        }

        set.set(BodyLandmark::LeftShoulder, Landmark::new(0.6, 0.5));
        assert!(FeatureExtractor::default().extract(&set).is_ok());
    }

    #[test]
    fn test_reference_values_order() {
        let features = FeatureVector {
            nose_y: 1.0,
            left_shoulder_y: 2.0,
            right_shoulder_y: 3.0,
            neck_angle_deg: 4.0,
            torso_angle_deg: 5.0,
            nose_hip_x_offset: 6.0,
        };
        assert_eq!(features.reference_values(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(FeatureVector::from_fn(|f| features.get(f)), features);
    }
}
