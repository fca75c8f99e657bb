//! Reference dataset rows and the CSV writer used by the batch labeler.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use crate::features::{Feature, FeatureVector};

/// Columns every reference dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Nose_Y",
    "Left_Shoulder_Y",
    "Right_Shoulder_Y",
    "Neck_Angle",
    "Torso_Angle",
    "Estado",
];

/// Column holding the posture label.
pub const LABEL_COLUMN: &str = "Estado";

/// One row of a reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(rename = "Video", default, deserialize_with = "csv::invalid_option")]
    pub video: Option<String>,
    /// Unparseable frame numbers are dropped rather than failing the row.
    #[serde(rename = "Frame", default, deserialize_with = "csv::invalid_option")]
    pub frame: Option<u64>,
    #[serde(rename = "Nose_Y")]
    pub nose_y: f64,
    #[serde(rename = "Left_Shoulder_Y")]
    pub left_shoulder_y: f64,
    #[serde(rename = "Right_Shoulder_Y")]
    pub right_shoulder_y: f64,
    #[serde(rename = "Neck_Angle")]
    pub neck_angle: f64,
    #[serde(rename = "Torso_Angle")]
    pub torso_angle: f64,
    #[serde(rename = "Estado")]
    pub label: String,
}

impl DatasetRow {
    pub fn new(features: &FeatureVector, label: impl Into<String>) -> Self {
        Self {
            video: None,
            frame: None,
            nose_y: features.nose_y,
            left_shoulder_y: features.left_shoulder_y,
            right_shoulder_y: features.right_shoulder_y,
            neck_angle: features.neck_angle_deg,
            torso_angle: features.torso_angle_deg,
            label: label.into(),
        }
    }

    pub fn with_provenance(mut self, video: impl Into<String>, frame: u64) -> Self {
        self.video = Some(video.into());
        self.frame = Some(frame);
        self
    }

    /// Feature vector of this row. Datasets carry no lateral offset, so that
    /// field is zero.
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            nose_y: self.nose_y,
            left_shoulder_y: self.left_shoulder_y,
            right_shoulder_y: self.right_shoulder_y,
            neck_angle_deg: self.neck_angle,
            torso_angle_deg: self.torso_angle,
            nose_hip_x_offset: 0.0,
        }
    }

    /// First reference feature holding a NaN or infinite value.
    pub fn first_non_finite(&self) -> Option<Feature> {
        let features = self.features();
        Feature::REFERENCE
            .into_iter()
            .find(|feature| !features.get(*feature).is_finite())
    }
}

/// Check that a header row contains every required column.
pub fn check_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> PosturaResult<()> {
    let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
    match REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.contains(column))
    {
        Some(column) => Err(PosturaError::MissingColumn {
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Writes dataset rows as CSV, header first.
pub struct DatasetWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows_written: u64,
}

impl DatasetWriter {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> PosturaResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = csv::Writer::from_path(&path)?;
        Ok(Self {
            writer,
            path,
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &DatasetRow) -> PosturaResult<()> {
        self.writer.serialize(row)?;
        self.rows_written += 1;

        if self.rows_written % 1000 == 0 {
            self.flush()?;
        }

        Ok(())
    }

    /// Flush buffered rows to disk.
    pub fn flush(&mut self) -> PosturaResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DatasetWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
