//! Frame stream: JSON lines produced by the pose-estimation collaborator.
//!
//! An optional first line `# {header}` describes the capture; every other
//! non-blank line is one [`PoseFrame`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use postura_common::error::{PosturaError, PosturaResult};

use crate::landmarks::PoseFrame;

pub const FRAME_STREAM_SCHEMA_VERSION: &str = "1.0";

/// Metadata line at the top of a frame stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameStreamHeader {
    pub schema_version: String,

    /// Camera index or file the frames were estimated from.
    pub source: Option<String>,

    /// Capture dimensions in pixels.
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
}

impl Default for FrameStreamHeader {
    fn default() -> Self {
        Self {
            schema_version: FRAME_STREAM_SCHEMA_VERSION.to_string(),
            source: None,
            frame_width: None,
            frame_height: None,
        }
    }
}

/// Parsed frame stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStream {
    pub header: Option<FrameStreamHeader>,
    pub frames: Vec<PoseFrame>,
}

impl FrameStream {
    /// Number of frames carrying a detection.
    pub fn detected_count(&self) -> usize {
        self.frames.iter().filter(|f| f.landmarks.is_some()).count()
    }
}

/// Parse frame stream content. Line numbers in errors are 1-based.
pub fn parse_frame_stream(content: &str) -> PosturaResult<FrameStream> {
    let mut stream = FrameStream::default();
    let mut seen_content = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if seen_content {
                return Err(PosturaError::frame_stream(
                    line_no,
                    "header line must precede all frames",
                ));
            }
            let header = serde_json::from_str(rest.trim())
                .map_err(|e| PosturaError::frame_stream(line_no, format!("invalid header: {e}")))?;
            stream.header = Some(header);
            seen_content = true;
            continue;
        }

        let frame: PoseFrame = serde_json::from_str(line)
            .map_err(|e| PosturaError::frame_stream(line_no, e.to_string()))?;
        stream.frames.push(frame);
        seen_content = true;
    }

    Ok(stream)
}

/// Read and parse a frame stream file.
pub fn read_frame_stream(path: impl AsRef<Path>) -> PosturaResult<FrameStream> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PosturaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let stream = parse_frame_stream(&content)?;

    tracing::debug!(
        path = %path.display(),
        frames = stream.frames.len(),
        detected = stream.detected_count(),
        "Read frame stream"
    );

    Ok(stream)
}

/// Serialize frames to frame stream format, header first when given.
pub fn serialize_frame_stream(
    header: Option<&FrameStreamHeader>,
    frames: &[PoseFrame],
) -> PosturaResult<String> {
    let mut output = String::new();
    if let Some(header) = header {
        output.push_str("# ");
        output.push_str(&serde_json::to_string(header)?);
        output.push('\n');
    }
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}
