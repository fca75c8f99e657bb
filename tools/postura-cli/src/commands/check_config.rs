//! Validate a configuration file.

use std::path::PathBuf;

use postura_common::config::config_file_path;

use crate::settings::Settings;

/// Check `path`, or the standard location when none is given.
pub fn run(path: Option<PathBuf>) -> anyhow::Result<()> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(config_file_path);
    println!("Checking configuration at: {}", path.display());

    if !path.exists() {
        if explicit {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        println!("  No file found; built-in defaults will be used.");
        return Ok(());
    }

    let settings = Settings::load(Some(&path))?;
    let classifier = &settings.classifier;

    println!("  Strategy: {:?}", classifier.strategy);
    println!("  History size: {}", classifier.history_size);
    println!("  Normalize: {}", classifier.normalize);
    println!("  Angle mode: {:?}", classifier.angle_mode);
    println!("  Vertical scale: {:?}", classifier.vertical_scale);
    println!("  Band rules: {}", classifier.bands.len());
    println!("  Lateral offset: {}", classifier.lateral_offset);
    println!("  Relative margin: {}", classifier.relative.margin);
    if let Some(tolerance) = &classifier.tolerance {
        println!(
            "  Tolerance: {} (positions), {} deg (angles)",
            tolerance.positions, tolerance.angles_deg
        );
    }
    println!("  Dataset: {}", settings.app.dataset_path.display());

    let warnings = collect_warnings(&settings);
    if warnings.is_empty() {
        println!("\nConfiguration is valid.");
    } else {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
        println!("\nConfiguration is valid with {} warning(s).", warnings.len());
    }

    Ok(())
}

fn collect_warnings(settings: &Settings) -> Vec<String> {
    let mut warnings = settings.classifier.warnings();
    if settings.classifier.strategy.needs_reference() && !settings.app.dataset_path.exists() {
        warnings.push(format!(
            "reference dataset {} does not exist; pass --dataset when classifying",
            settings.app.dataset_path.display()
        ));
    }
    if let Some(file) = &settings.app.logging.file {
        if file.parent().is_some_and(|p| !p.as_os_str().is_empty() && !p.exists()) {
            warnings.push(format!("log directory for {} does not exist", file.display()));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use postura_core::features::VerticalScale;
    use postura_core::matcher::MatchStrategy;

    #[test]
    fn test_explicit_missing_path_is_error() {
        let path = std::env::temp_dir().join("postura_test_check_config_missing.json");
        let _ = std::fs::remove_file(&path);
        let err = run(Some(path)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_existing_file_is_checked() {
        let dir = std::env::temp_dir().join("postura_test_check_config");
        let path = dir.join("config.json");
        let _ = std::fs::remove_dir_all(&dir);
        Settings::default().save(&path).unwrap();

        assert!(run(Some(path)).is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pixel_scale_bands_reported() {
        let mut settings = Settings::default();
        settings.classifier.strategy = MatchStrategy::ThresholdBands;
        settings.classifier.vertical_scale = VerticalScale::Pixels {
            frame_height: 480.0,
        };
        let warnings = collect_warnings(&settings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("pixels"));
    }
}
