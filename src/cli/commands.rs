//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    format_bytes, format_duration, print_divider, print_error, print_header, print_info,
    print_success, print_warning, HashProgressBar,
};
use crate::cli::{Args, Commands};
use crate::core::config::{get_config_path, init_config, open_config_in_editor, Config};
use crate::core::enumerate::Exclusions;
use crate::core::error::ChksumError;
use crate::core::events::{IndexEvent, ScanReport};
use crate::core::queue::MemoryQueue;
use crate::core::scan::{options_from_config, run_scan};
use crate::index::{self, IndexRecord, IndexStore};
use anyhow::Result;
use clap::CommandFactory;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Run the appropriate command based on CLI arguments
pub fn run_command(args: &Args, config: &Config) -> Result<()> {
    let root = config.resolve_root(args.root.as_deref());

    match &args.command {
        Some(Commands::Init) => {
            init_index(config, &root)?;
        }
        Some(Commands::Scan {
            algorithm,
            buffer_size,
            threads,
            json,
        }) => {
            scan_index(
                config,
                &root,
                algorithm.as_deref(),
                buffer_size.as_deref(),
                threads.as_deref(),
                *json,
            )?;
        }
        Some(Commands::Sweep { json }) => {
            sweep_index(config, &root, *json)?;
        }
        Some(Commands::Compare { database, json }) => {
            compare_indexes(config, &root, database, *json)?;
        }
        Some(Commands::Compact) => {
            compact_index(config, &root)?;
        }
        Some(Commands::List { json }) => {
            list_records(config, &root, *json)?;
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config, &root);
        }
        None => {
            Args::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Path of the index database under `root`
fn database_path(config: &Config, root: &Path) -> PathBuf {
    root.join(&config.index.database_name)
}

/// Open the index under `root` for writing, refusing to create a new one
fn open_existing_for_write(config: &Config, root: &Path) -> Result<IndexStore> {
    let path = database_path(config, root);
    if !path.is_file() {
        return Err(ChksumError::IndexNotFound(path).into());
    }
    Ok(IndexStore::open(root, &config.index.database_name)?)
}

fn exclusions_for(config: &Config) -> Exclusions {
    Exclusions::for_index(&config.index.database_name, &config.log_file_name())
        .with_names(&config.index.exclude)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle the `init` command
pub fn init_index(config: &Config, root: &Path) -> Result<()> {
    let path = database_path(config, root);
    let existed = path.exists();

    let store = IndexStore::open(root, &config.index.database_name)?;

    if existed {
        print_info(&format!(
            "Index already exists at {} ({} record(s))",
            store.database_path().display(),
            store.len()?
        ));
    } else {
        print_success(&format!("Created index at {}", store.database_path().display()));
    }

    Ok(())
}

/// Handle the `scan` command
pub fn scan_index(
    config: &Config,
    root: &Path,
    algorithm: Option<&str>,
    buffer_size: Option<&str>,
    threads: Option<&str>,
    json: bool,
) -> Result<()> {
    // Reject bad settings before the index is touched
    let options = options_from_config(&config.hashing, algorithm, buffer_size, threads)?;
    let exclusions = exclusions_for(config);

    let store = IndexStore::open(root, &config.index.database_name)?;
    info!(
        "Scanning {} with {} ({} byte chunks)",
        root.display(),
        options.algorithm(),
        options.buffer_size()
    );

    let progress = if json {
        HashProgressBar::hidden()
    } else {
        HashProgressBar::new(0)
    };

    let mut queue = MemoryQueue::new();
    let report = match run_scan(&store, &options, &exclusions, &mut queue, |update| {
        progress.update(&update)
    }) {
        Ok(report) => {
            progress.finish();
            report
        }
        Err(e) => {
            progress.finish_with_error(&e.to_string());
            return Err(e.into());
        }
    };

    if json {
        return print_json(&report);
    }

    print_scan_report(&report);
    println!("  Elapsed: {}", format_duration(progress.elapsed()));

    Ok(())
}

fn print_scan_report(report: &ScanReport) {
    print_header("Scan Summary");

    for event in &report.events {
        print_event(event);
    }
    for failure in &report.failures {
        print_warning(&format!(
            "Could not hash {}: {}",
            failure.path.display(),
            failure.reason
        ));
    }

    print_divider();
    println!("  Files found:     {}", report.files_found);
    println!("  Files hashed:    {}", report.files_hashed);
    println!("  New:             {}", report.new_count());
    println!("  Moved:           {}", report.moved_count());
    println!("  Duplicates:      {}", report.duplicate_count());
    if !report.failures.is_empty() {
        println!("  Unreadable:      {}", report.failures.len());
    }
    println!();

    if report.changed_index() {
        print_success("Index updated");
    } else {
        print_success("Index already up to date");
    }
}

fn print_event(event: &IndexEvent) {
    let label = event.label();
    match event {
        IndexEvent::New { path, .. } | IndexEvent::Deleted { path, .. } => {
            print_info(&format!("{:<10} {}", label, path))
        }
        IndexEvent::Moved { from, to, .. } => {
            print_info(&format!("{:<10} {} -> {}", label, from, to))
        }
        IndexEvent::Duplicate { path, original, .. } => print_warning(&format!(
            "{:<10} {} (same content as {})",
            label, path, original
        )),
    }
}

/// Handle the `sweep` command
pub fn sweep_index(config: &Config, root: &Path, json: bool) -> Result<()> {
    let store = open_existing_for_write(config, root)?;
    let events = index::sweep(&store)?;

    if json {
        return print_json(&events);
    }

    for event in &events {
        print_event(event);
    }
    print_success(&format!(
        "Removed {} record(s) for deleted files, {} remaining",
        events.len(),
        store.len()?
    ));

    Ok(())
}

/// Handle the `compare` command
pub fn compare_indexes(config: &Config, root: &Path, other: &Path, json: bool) -> Result<()> {
    let primary = IndexStore::open_existing(&database_path(config, root))?;
    let missing = index::diff_against(&primary, other)?;

    if json {
        return print_json(&missing);
    }

    if missing.is_empty() {
        print_success(&format!(
            "Every indexed file is also present in {}",
            other.display()
        ));
        return Ok(());
    }

    print_header(&format!("Missing from {}", other.display()));
    for record in &missing {
        println!("{}", record.file_name);
    }
    println!();
    print_warning(&format!("{} file(s) missing", missing.len()));

    Ok(())
}

/// Handle the `compact` command
pub fn compact_index(config: &Config, root: &Path) -> Result<()> {
    let store = open_existing_for_write(config, root)?;
    let before = fs::metadata(store.database_path())?.len();

    store.compact()?;

    let after = fs::metadata(store.database_path())?.len();
    print_success(&format!(
        "Compacted {} ({} -> {})",
        store.database_path().display(),
        format_bytes(before),
        format_bytes(after)
    ));

    Ok(())
}

/// Handle the `list` command
pub fn list_records(config: &Config, root: &Path, json: bool) -> Result<()> {
    let store = IndexStore::open_existing(&database_path(config, root))?;
    let records = store.list_all()?;

    if json {
        return print_json(&records);
    }

    for record in &records {
        println!("{}", format_record(record));
    }
    info!("{} record(s) in {}", records.len(), store.database_path().display());

    Ok(())
}

fn format_record(record: &IndexRecord) -> String {
    format!("{}  {}", record.content_hash, record.relative_path)
}

/// Handle the `config` command - open, show path, or reset the config file
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        print_success(&format!("Created fresh config file at: {}", path.display()));
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            print_info(&format!("Config file: {}", path.display()));
            print_info("Run 'chksum show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            print_error(&format!("Failed to open config file: {}", e));
            if let Some(path) = get_config_path() {
                print_info(&format!("You can manually edit the config at: {}", path.display()));
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            fs::write(&path, Config::generate_default_config())?;
            path
        }
        None => init_config()?,
    };

    print_success(&format!("Configuration file: {}", output_path.display()));
    print_info("Run 'chksum config' to open the config in your editor.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config, root: &Path) {
    let config_path = Config::get_active_config_path();
    println!("# Configuration file: {}", config_path.display());
    if !config_path.exists() {
        println!("# (Using default settings - no config file found)");
    }
    println!("# Effective index root: {}", root.display());
    println!("# Log file: {}", config.log_file_path(root).display());
    let exclusions = exclusions_for(config);
    let excluded: Vec<&str> = exclusions.names().collect();
    println!("# Never indexed: {}", excluded.join(", "));
    println!();

    match config.to_toml() {
        Ok(text) => println!("{}", text),
        Err(e) => print_error(&format!("Failed to render configuration: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> Config {
        let mut config = Config::default();
        config.index.root = Some(root.to_path_buf());
        config.logging.log_to_file = false;
        config
    }

    #[test]
    fn test_init_then_scan_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        let config = config_for(root);

        init_index(&config, root).unwrap();
        assert!(root.join("chksum.db").exists());

        scan_index(&config, root, None, None, Some("1"), true).unwrap();
        list_records(&config, root, true).unwrap();

        let store = IndexStore::open_existing(&root.join("chksum.db")).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_scan_with_bad_settings_creates_no_index() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        let config = config_for(root);

        assert!(scan_index(&config, root, Some("sha999"), None, None, true).is_err());
        assert!(scan_index(&config, root, None, Some("-1"), None, true).is_err());
        assert!(!root.join("chksum.db").exists());
    }

    #[test]
    fn test_maintenance_requires_existing_index() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let config = config_for(root);

        let err = sweep_index(&config, root, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChksumError>(),
            Some(ChksumError::IndexNotFound(_))
        ));
        assert!(compact_index(&config, root).is_err());
        assert!(list_records(&config, root, true).is_err());
        assert!(!root.join("chksum.db").exists());
    }

    #[test]
    fn test_compare_against_missing_database() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let config = config_for(root);
        init_index(&config, root).unwrap();

        let err = compare_indexes(&config, root, Path::new("/nonexistent/chksum.db"), true)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChksumError>(),
            Some(ChksumError::IndexNotFound(_))
        ));
    }

    #[test]
    fn test_generate_config_to_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chksum.toml");

        generate_config_file(Some(path.clone())).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.index.database_name, "chksum.db");
    }

    #[test]
    fn test_format_record() {
        let record = IndexRecord {
            content_hash: "abc".into(),
            file_name: "a.txt".into(),
            relative_path: "docs/a.txt".into(),
            metadata: Default::default(),
        };
        assert_eq!(format_record(&record), "abc  docs/a.txt");
    }
}
