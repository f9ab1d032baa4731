//! Scan orchestration
//!
//! One scan run: check the index settings, enumerate the root, hash every
//! file in parallel, hand the pairs through the queue and reconcile them
//! against the index on the calling thread.

use crate::core::config::HashingConfig;
use crate::core::enumerate::{enumerate, Exclusions};
use crate::core::error::{ChksumError, Result};
use crate::core::events::{HashFailure, ScanReport};
use crate::core::queue::PairQueue;
use crate::hashing::{hash_many, parse_thread_count, HashOptions, HashProgress};
use crate::index::{IndexStore, Reconciler};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Build hashing options from the configuration and optional command-line
/// overrides. Must succeed before any index is opened.
pub fn options_from_config(
    hashing: &HashingConfig,
    algorithm: Option<&str>,
    buffer_size: Option<&str>,
    threads: Option<&str>,
) -> Result<HashOptions> {
    let algorithm = algorithm.unwrap_or(&hashing.algorithm);
    let buffer_size = buffer_size
        .map(str::to_string)
        .unwrap_or_else(|| hashing.buffer_size.to_string());
    let threads = match threads {
        Some(raw) => parse_thread_count(raw)?,
        None => hashing.threads,
    };

    Ok(HashOptions::from_raw(algorithm, &buffer_size)?.with_threads(threads))
}

/// Make sure the index is (or becomes) tagged with the scan's algorithm and,
/// for the chunk-folded algorithms, its buffer size
fn check_index_settings(store: &IndexStore, options: &HashOptions) -> Result<()> {
    let algorithm = options.algorithm();
    match store.algorithm()? {
        Some(recorded) if recorded != algorithm => {
            return Err(ChksumError::AlgorithmMismatch {
                index: recorded.to_string(),
                requested: algorithm.to_string(),
            });
        }
        Some(_) => {}
        None => {
            if !store.is_empty()? {
                warn!("Index has no recorded algorithm; assuming {}", algorithm);
            }
            store.record_algorithm(algorithm)?;
        }
    }

    if algorithm.is_cryptographic() {
        return Ok(());
    }

    match store.buffer_size()? {
        Some(recorded) if recorded != options.buffer_size() => Err(ChksumError::BufferSizeMismatch {
            algorithm: algorithm.to_string(),
            index: recorded,
            requested: options.buffer_size(),
        }),
        Some(_) => Ok(()),
        None => {
            if !store.is_empty()? {
                warn!(
                    "Index has no recorded buffer size; assuming {} bytes",
                    options.buffer_size()
                );
            }
            store.record_buffer_size(options.buffer_size())
        }
    }
}

/// Scan the store's root and bring the index up to date
pub fn run_scan<Q, F>(
    store: &IndexStore,
    options: &HashOptions,
    exclusions: &Exclusions,
    queue: &mut Q,
    progress: F,
) -> Result<ScanReport>
where
    Q: PairQueue + ?Sized,
    F: Fn(HashProgress) + Send + Sync,
{
    check_index_settings(store, options)?;

    let paths = enumerate(store.root(), exclusions)?;
    scan_paths(store, options, paths, queue, progress)
}

fn scan_paths<Q, F>(
    store: &IndexStore,
    options: &HashOptions,
    paths: Vec<PathBuf>,
    queue: &mut Q,
    progress: F,
) -> Result<ScanReport>
where
    Q: PairQueue + ?Sized,
    F: Fn(HashProgress) + Send + Sync,
{
    let mut report = ScanReport {
        files_found: paths.len(),
        ..Default::default()
    };

    if paths.is_empty() {
        info!("Nothing to scan under {}", store.root().display());
        return Ok(report);
    }

    // a lossy name would be stored under a path that never resolves again
    let (paths, unnamed): (Vec<PathBuf>, Vec<PathBuf>) =
        paths.into_iter().partition(|path| path.to_str().is_some());
    let mut failures: Vec<HashFailure> = unnamed
        .into_iter()
        .map(|path| {
            warn!("Skipping {}: name is not valid UTF-8", path.display());
            HashFailure::new(path, "file name is not valid UTF-8")
        })
        .collect();

    let batch = hash_many(&paths, options, progress)?;
    let (files, hash_failures) = batch.into_files();
    failures.extend(hash_failures);
    failures.sort_by(|a, b| a.path.cmp(&b.path));
    report.files_hashed = files.len();
    report.failures = failures;

    queue.stash(files)?;
    debug!("{} pair(s) queued for reconciliation", queue.len());
    let pending = queue.drain()?;

    report.events = Reconciler::new(store).reconcile(pending)?;

    info!(
        "Scan complete: {} found, {} hashed, {} new, {} moved, {} duplicate, {} failed",
        report.files_found,
        report.files_hashed,
        report.new_count(),
        report.moved_count(),
        report.duplicate_count(),
        report.failures.len()
    );

    Ok(report)
}
