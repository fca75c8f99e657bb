//! Error types shared across Postura crates.

use std::path::PathBuf;

/// Top-level error type for Postura operations.
#[derive(Debug, thiserror::Error)]
pub enum PosturaError {
    #[error("Missing landmark: {landmark}")]
    MissingLandmarks { landmark: String },

    #[error("Reference dataset not found: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Reference dataset is empty: {path}")]
    DatasetEmpty { path: PathBuf },

    #[error("Reference dataset is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("Feature '{feature}' has zero variance and cannot be normalized")]
    DegenerateFeature { feature: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Frame stream error at line {line}: {message}")]
    FrameStream { line: usize, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PosturaError.
pub type PosturaResult<T> = Result<T, PosturaError>;

impl PosturaError {
    pub fn missing_landmark(landmark: impl Into<String>) -> Self {
        Self::MissingLandmarks {
            landmark: landmark.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn degenerate(feature: impl Into<String>) -> Self {
        Self::DegenerateFeature {
            feature: feature.into(),
        }
    }

    pub fn frame_stream(line: usize, msg: impl Into<String>) -> Self {
        Self::FrameStream {
            line,
            message: msg.into(),
        }
    }

    /// Whether this error only affects a single frame and the session may
    /// continue with the next one.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::MissingLandmarks { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PosturaError::missing_landmark("left_hip");
        assert_eq!(err.to_string(), "Missing landmark: left_hip");
        assert!(err.is_frame_local());

        let err = PosturaError::degenerate("Nose_Y");
        assert!(err.to_string().contains("Nose_Y"));
        assert!(!err.is_frame_local());

        let err = PosturaError::frame_stream(3, "expected value");
        assert_eq!(
            err.to_string(),
            "Frame stream error at line 3: expected value"
        );
    }
}
