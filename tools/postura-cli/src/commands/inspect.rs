//! Show reference dataset statistics.

use std::path::PathBuf;

use anyhow::Context;

use postura_core::features::Feature;
use postura_core::reference::ReferenceStore;

pub fn run(dataset: PathBuf, raw: bool) -> anyhow::Result<()> {
    let store = ReferenceStore::load_csv(&dataset, !raw).with_context(|| {
        format!(
            "Failed to load reference dataset {} (try --raw if a feature is constant)",
            dataset.display()
        )
    })?;

    println!("Dataset: {}", dataset.display());
    println!("  Samples: {}", store.len());
    println!("  Normalized: {}", store.is_normalized());
    println!();

    println!("Labels:");
    for (label, count) in store.label_counts() {
        println!("  {label}: {count}");
    }
    println!();

    if let Some(ranges) = store.ranges() {
        println!("Feature ranges:");
        for (feature, range) in Feature::REFERENCE.iter().zip(ranges.iter()) {
            println!(
                "  {:<17} [{:.4}, {:.4}]",
                feature.column(),
                range.min,
                range.max
            );
        }
    }

    Ok(())
}
