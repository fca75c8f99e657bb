//! Postura CLI: command-line interface for posture classification.
//!
//! Usage:
//!   postura classify <FRAMES>     Label every frame of a landmark stream
//!   postura label <INPUT>         Bootstrap a reference dataset heuristically
//!   postura inspect <DATASET>     Summarize a reference dataset
//!   postura init-config           Write the default configuration
//!   postura check-config [PATH]   Validate a configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use postura_common::logging;

mod commands;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(
    name = "postura",
    about = "Posture classification from body landmark streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/postura/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every frame of a landmark stream
    Classify {
        /// Frame stream (JSON lines)
        frames: PathBuf,

        /// Reference dataset (overrides the configured path)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Matching strategy: nearest|bands|relative
        #[arg(short, long)]
        strategy: Option<String>,

        /// Smoothing window in frames
        #[arg(short, long)]
        window: Option<usize>,

        /// Compare raw feature values instead of min/max normalized ones
        #[arg(long)]
        raw: bool,

        /// Print one JSON object per classified frame
        #[arg(long)]
        json: bool,
    },

    /// Label frame streams heuristically and write a reference dataset
    Label {
        /// Frame stream file, or a directory of .jsonl streams
        input: PathBuf,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Dead band around the shoulder line, in the units of the configured
        /// vertical scale (pixels when `vertical_scale` is pixels)
        #[arg(long, default_value = "0.0")]
        margin: f64,
    },

    /// Show reference dataset statistics
    Inspect {
        /// Reference dataset (CSV)
        dataset: PathBuf,

        /// Report without min/max normalization
        #[arg(long)]
        raw: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination (defaults to the standard config location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Configuration file to check
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging comes from the config file when it loads; a broken file is
    // reported after logging is up.
    let settings = Settings::load(cli.config.as_deref());
    let mut logging_config = settings
        .as_ref()
        .map(|s| s.app.logging.clone())
        .unwrap_or_default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    logging::init_logging(&logging_config);

    match cli.command {
        Commands::Classify {
            frames,
            dataset,
            strategy,
            window,
            raw,
            json,
        } => {
            let settings = loaded(settings)?;
            commands::classify::run(&settings, frames, dataset, strategy, window, raw, json)
        }
        Commands::Label {
            input,
            output,
            margin,
        } => {
            let settings = loaded(settings)?;
            commands::label::run(&settings, input, output, margin)
        }
        Commands::Inspect { dataset, raw } => commands::inspect::run(dataset, raw),
        Commands::InitConfig { output, force } => {
            commands::init_config::run(output.or(cli.config), force)
        }
        Commands::CheckConfig { path } => commands::check_config::run(path.or(cli.config)),
    }
}

fn loaded(settings: anyhow::Result<Settings>) -> anyhow::Result<Settings> {
    let settings = settings?;
    settings.log_source();
    Ok(settings)
}
