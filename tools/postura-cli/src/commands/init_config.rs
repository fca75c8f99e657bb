//! Write the default configuration file.

use std::path::PathBuf;

use postura_common::config::config_file_path;

use crate::settings::Settings;

pub fn run(output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(config_file_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Settings::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());

    Ok(())
}
