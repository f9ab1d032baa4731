//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Content-addressed file index: tracks every file under a root by the hash of
/// its bytes, so moves, renames and duplicates are recognized by content
#[derive(Parser, Debug)]
#[command(name = "chksum")]
#[command(version)]
#[command(
    about = "Content-addressed file index: detect new, moved, duplicate and deleted files",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Index root directory (overrides config; defaults to the executable's directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the index database in the root if it does not exist
    #[command(alias = "createDB")]
    Init,

    /// Hash every file under the root and update the index
    ///
    /// New content is added, content found at a different path is recorded
    /// as moved, and further copies of indexed content are reported as
    /// duplicates.
    #[command(alias = "checksum")]
    Scan {
        /// Hash algorithm: sha256, xxh32 or xxh64 (overrides config)
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Bytes read per chunk (overrides config)
        #[arg(short, long, value_name = "BYTES", allow_hyphen_values = true)]
        buffer_size: Option<String>,

        /// Hashing worker threads, 0 = one per hardware thread (overrides config)
        #[arg(short, long, allow_hyphen_values = true)]
        threads: Option<String>,

        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove index records whose file no longer exists
    #[command(alias = "checkIfFileWasDeleted")]
    Sweep {
        /// Print the removed records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List content indexed here but missing from another index
    #[command(alias = "compareDatabases")]
    Compare {
        /// Index database to compare against
        database: PathBuf,

        /// Print the missing records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reclaim unused space in the index database
    #[command(alias = "cleanDB")]
    Compact,

    /// Print every index record
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\chksum\config.toml
    /// - Linux: ~/.config/chksum/config.toml
    /// - macOS: ~/Library/Application Support/chksum/config.toml
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,
}
