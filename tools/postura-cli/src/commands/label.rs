//! Bootstrap a reference dataset from frame streams.

use std::path::{Path, PathBuf};

use anyhow::Context;

use postura_core::dataset::DatasetWriter;
use postura_core::features::FeatureExtractor;
use postura_core::labeler::{label_stream, HeuristicLabeler, LabelStats};
use postura_core::stream::read_frame_stream;

use crate::settings::Settings;

pub fn run(settings: &Settings, input: PathBuf, output: PathBuf, margin: f64) -> anyhow::Result<()> {
    if !margin.is_finite() || margin < 0.0 {
        anyhow::bail!("Margin must be a non-negative number, got {margin}");
    }

    let inputs = collect_inputs(&input)?;
    println!("Labeling {} stream(s) into {}", inputs.len(), output.display());

    let extractor = FeatureExtractor::new(
        settings.classifier.angle_mode,
        settings.classifier.vertical_scale,
    );
    let labeler = HeuristicLabeler::with_margin(margin);
    let mut writer = DatasetWriter::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut total = LabelStats::default();
    for path in &inputs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let stream = read_frame_stream(path)
            .with_context(|| format!("Failed to read frames from {}", path.display()))?;

        let stats = label_stream(&name, &stream.frames, &extractor, &labeler, &mut writer)?;
        println!(
            "  {name}: {} row(s) from {} frame(s), {} skipped",
            stats.rows_written, stats.frames, stats.skipped
        );
        total += stats;
    }
    writer.flush()?;

    println!();
    println!(
        "Wrote {} row(s) ({} frame(s) skipped).",
        total.rows_written, total.skipped
    );

    Ok(())
}

/// A single stream file, or every `.jsonl` file of a directory in name order.
fn collect_inputs(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)
        .with_context(|| format!("Failed to list {}", input.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .jsonl frame streams found in {}", input.display());
    }
    Ok(files)
}
