//! Temporal smoothing of feature vectors.
//!
//! Each feature keeps a bounded FIFO window of its most recent raw values;
//! the smoothed vector is the per-feature mean of those windows. This damps
//! frame-to-frame jitter from the pose estimator.

use std::collections::VecDeque;

use crate::features::{Feature, FeatureVector};

/// Default number of frames averaged per feature.
pub const DEFAULT_HISTORY_SIZE: usize = 5;

/// Fixed-capacity FIFO window of scalar values.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one when full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Mean of the current contents, `None` while empty.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values from oldest to newest.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

/// One smoothing window per feature, owned by a capture session.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    windows: [SmoothingWindow; 6],
}

impl TemporalSmoother {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: std::array::from_fn(|_| SmoothingWindow::new(capacity)),
        }
    }

    /// Record a raw vector and return the smoothed one.
    pub fn observe(&mut self, raw: FeatureVector) -> FeatureVector {
        for feature in Feature::ALL {
            self.windows[feature.index()].push(raw.get(feature));
        }
        // Every window holds at least the value just pushed.
        self.current().unwrap_or(raw)
    }

    /// Current smoothed vector, `None` before the first observation.
    pub fn current(&self) -> Option<FeatureVector> {
        if self.is_empty() {
            return None;
        }
        Some(FeatureVector::from_fn(|feature| {
            self.windows[feature.index()].mean().unwrap_or_default()
        }))
    }

    pub fn window(&self, feature: Feature) -> &SmoothingWindow {
        &self.windows[feature.index()]
    }

    /// Number of observations currently held (identical across features).
    pub fn len(&self) -> usize {
        self.windows[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows[0].is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.windows[0].capacity()
    }
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
