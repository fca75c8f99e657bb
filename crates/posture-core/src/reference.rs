//! Reference store: labelled feature vectors loaded once per session.
//!
//! In normalized mode every reference feature is min/max scaled over the
//! whole dataset at load time. Live queries are scaled with the same stored
//! ranges so reference and query share one coordinate system.

use std::path::Path;

use serde::Serialize;

use postura_common::error::{PosturaError, PosturaResult};

use crate::dataset::{check_columns, DatasetRow};
use crate::features::{Feature, FeatureVector};

/// Provenance of a reference sample in the recording it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub video: String,
    pub frame: Option<u64>,
}

/// A labelled feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSample {
    pub features: FeatureVector,
    pub label: String,
    pub provenance: Option<Provenance>,
}

impl ReferenceSample {
    pub fn new(features: FeatureVector, label: impl Into<String>) -> Self {
        Self {
            features,
            label: label.into(),
            provenance: None,
        }
    }
}

impl From<DatasetRow> for ReferenceSample {
    fn from(row: DatasetRow) -> Self {
        let features = row.features();
        let provenance = row.video.map(|video| Provenance {
            video,
            frame: row.frame,
        });
        Self {
            features,
            label: row.label,
            provenance,
        }
    }
}

/// Observed value range of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |range, v| match range {
            None => Some(FeatureRange { min: v, max: v }),
            Some(r) => Some(FeatureRange {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map `value` into `[0, 1]` relative to this range. Values outside the
    /// range map outside `[0, 1]`.
    pub fn scale(&self, value: f64) -> f64 {
        (value - self.min) / self.span()
    }
}

/// Per-feature ranges used for min/max scaling, in [`Feature::REFERENCE`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    ranges: [FeatureRange; 5],
}

impl Normalization {
    /// Compute ranges over `samples`, failing on any zero-variance feature.
    fn fit(samples: &[ReferenceSample]) -> PosturaResult<Option<Self>> {
        let Some(ranges) = reference_ranges(samples) else {
            return Ok(None);
        };
        for (feature, range) in Feature::REFERENCE.iter().zip(ranges.iter()) {
            if range.span() == 0.0 {
                return Err(PosturaError::degenerate(feature.column()));
            }
        }
        Ok(Some(Self { ranges }))
    }

    pub fn ranges(&self) -> &[FeatureRange; 5] {
        &self.ranges
    }

    pub fn scale(&self, values: [f64; 5]) -> [f64; 5] {
        std::array::from_fn(|i| self.ranges[i].scale(values[i]))
    }
}

fn reference_ranges(samples: &[ReferenceSample]) -> Option<[FeatureRange; 5]> {
    let mut ranges = [FeatureRange { min: 0.0, max: 0.0 }; 5];
    for (slot, feature) in ranges.iter_mut().zip(Feature::REFERENCE) {
        *slot = FeatureRange::of(samples.iter().map(|s| s.features.get(feature)))?;
    }
    Some(ranges)
}

/// Immutable collection of reference samples.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    samples: Vec<ReferenceSample>,
    normalization: Option<Normalization>,
    /// Comparison points, scaled when normalization is active.
    points: Vec<[f64; 5]>,
}

impl ReferenceStore {
    /// A store with no samples. Matching against it always yields the
    /// unknown label.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a store from samples already in memory.
    pub fn from_samples(samples: Vec<ReferenceSample>, normalize: bool) -> PosturaResult<Self> {
        let normalization = if normalize {
            Normalization::fit(&samples)?
        } else {
            None
        };

        let points = samples
            .iter()
            .map(|s| {
                let values = s.features.reference_values();
                match &normalization {
                    Some(n) => n.scale(values),
                    None => values,
                }
            })
            .collect();

        Ok(Self {
            samples,
            normalization,
            points,
        })
    }

    /// Load a CSV dataset with `Nose_Y, Left_Shoulder_Y, Right_Shoulder_Y,
    /// Neck_Angle, Torso_Angle, Estado` columns.
    pub fn load_csv(path: impl AsRef<Path>, normalize: bool) -> PosturaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PosturaError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        check_columns(reader.headers()?.iter())?;

        let mut samples = Vec::new();
        for (i, record) in reader.deserialize::<DatasetRow>().enumerate() {
            let row = record?;
            if let Some(feature) = row.first_non_finite() {
                return Err(PosturaError::config(format!(
                    "dataset row {} has a non-finite {} value",
                    i + 1,
                    feature.column()
                )));
            }
            samples.push(ReferenceSample::from(row));
        }

        if samples.is_empty() {
            return Err(PosturaError::DatasetEmpty {
                path: path.to_path_buf(),
            });
        }

        let store = Self::from_samples(samples, normalize)?;
        tracing::info!(
            path = %path.display(),
            samples = store.len(),
            labels = store.label_counts().len(),
            normalized = store.is_normalized(),
            "Loaded reference dataset"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalization.is_some()
    }

    pub fn normalization(&self) -> Option<&Normalization> {
        self.normalization.as_ref()
    }

    pub fn samples(&self) -> &[ReferenceSample] {
        &self.samples
    }

    /// Comparison points paired with their labels, in load order.
    pub fn points(&self) -> impl Iterator<Item = (&[f64; 5], &str)> {
        self.points
            .iter()
            .zip(self.samples.iter().map(|s| s.label.as_str()))
    }

    /// Bring a live query into the store's coordinate system.
    pub fn scale_query(&self, query: &FeatureVector) -> [f64; 5] {
        let values = query.reference_values();
        match &self.normalization {
            Some(n) => n.scale(values),
            None => values,
        }
    }

    /// Raw per-feature ranges over all samples, `None` when empty.
    pub fn ranges(&self) -> Option<[FeatureRange; 5]> {
        reference_ranges(&self.samples)
    }

    /// Distinct labels in first-seen order with their sample counts.
    pub fn label_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for sample in &self.samples {
            match counts.iter_mut().find(|(label, _)| *label == sample.label) {
                Some((_, count)) => *count += 1,
                None => counts.push((sample.label.as_str(), 1)),
            }
        }
        counts
    }
}
