//! chksum - CLI Entry Point
//!
//! This binary is a thin wrapper around the library, handling argument parsing,
//! logging setup, and command dispatch.

use anyhow::{Context, Result};
use chksum::cli::{self, Args, DualWriter};
use chksum::core::config::Config;
use chksum::core::error::ChksumError;
use clap::Parser;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration. An explicitly named file must load.
    let mut config = match args.config {
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_default()?,
    };

    // Apply CLI overrides to config
    if let Some(ref root) = args.root {
        config.index.root = Some(root.clone());
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    let root = config.resolve_root(None);

    // Initialize logger
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let log_path = config.log_file_path(&root);
    if config.logging.log_to_file && root.is_dir() {
        // Set up logging to both console and file
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        Builder::new()
            .filter_level(log_level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {} {}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .target(env_logger::Target::Pipe(Box::new(DualWriter {
                console: std::io::stderr(),
                file: log_file,
            })))
            .init();

        debug!("Logging to file: {}", log_path.display());
    } else {
        Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
            .init();
    }

    info!("chksum v{}", chksum::VERSION);
    debug!("Index root: {}", root.display());

    if let Err(e) = cli::run_command(&args, &config) {
        if let Some(err) = e.downcast_ref::<ChksumError>() {
            if err.is_configuration() {
                error!("Nothing was changed: {}", err);
            }
        }
        return Err(e);
    }

    Ok(())
}
