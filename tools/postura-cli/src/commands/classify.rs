//! Classify a landmark frame stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use postura_core::matcher::MatchStrategy;
use postura_core::pipeline::PostureClassifier;
use postura_core::reference::ReferenceStore;
use postura_core::stream::read_frame_stream;

use crate::settings::Settings;

pub fn run(
    settings: &Settings,
    frames: PathBuf,
    dataset: Option<PathBuf>,
    strategy: Option<String>,
    window: Option<usize>,
    raw: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = settings.classifier.clone();
    if let Some(name) = strategy {
        config.strategy = MatchStrategy::parse(&name).ok_or_else(|| {
            anyhow::anyhow!("Unknown strategy '{name}' (expected nearest, bands, or relative)")
        })?;
    }
    if let Some(window) = window {
        config.history_size = window;
    }
    if raw {
        config.normalize = false;
    }

    let stream = read_frame_stream(&frames)
        .with_context(|| format!("Failed to read frames from {}", frames.display()))?;

    let store = if config.strategy.needs_reference() {
        let path = dataset.unwrap_or_else(|| settings.app.dataset_path.clone());
        let store = ReferenceStore::load_csv(&path, config.normalize)
            .with_context(|| format!("Failed to load reference dataset {}", path.display()))?;
        Some(Arc::new(store))
    } else {
        None
    };

    let mut classifier =
        PostureClassifier::from_config(&config, store).context("Invalid classifier settings")?;

    for frame in &stream.frames {
        let Some(classification) = classifier.process(frame) else {
            continue;
        };
        if json {
            println!("{}", serde_json::to_string(&classification)?);
        } else {
            println!("frame {}: {}", classification.frame, classification.label);
        }
    }

    let stats = classifier.stats();
    tracing::info!(
        strategy = classifier.strategy_name(),
        frames = stats.frames_seen,
        classified = stats.frames_classified,
        skipped = stats.frames_skipped,
        "Session finished"
    );

    Ok(())
}
