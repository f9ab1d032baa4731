//! Enumerator
//!
//! Walks the index root once and lists every regular file, leaving out the
//! tool's own artifacts: the index database (and its SQLite side files), the
//! log file and the chksum executable. Symbolic links are never followed.

use crate::core::config::{DEFAULT_DATABASE_NAME, DEFAULT_LOG_FILE};
use crate::core::error::{ChksumError, Result};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffixes SQLite appends to the database name for its side files
const DATABASE_SIDE_FILES: &[&str] = &["-journal", "-wal", "-shm"];

/// File names that are never indexed
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    names: BTreeSet<String>,
}

impl Exclusions {
    /// Exclusion set for an index with the given database and log file names,
    /// plus the running executable
    pub fn for_index(database_name: &str, log_file_name: &str) -> Self {
        let mut exclusions = Self::default();

        exclusions.add(database_name);
        for suffix in DATABASE_SIDE_FILES {
            exclusions.add(&format!("{}{}", database_name, suffix));
        }
        exclusions.add(log_file_name);

        if let Some(exe_name) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
        {
            exclusions.add(&exe_name);
        }

        exclusions
    }

    /// Add extra file names to exclude
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add(name.as_ref());
        }
        self
    }

    fn add(&mut self, name: &str) {
        if !name.is_empty() {
            self.names.insert(name.to_string());
        }
    }

    /// Whether the file at `path` must be skipped
    pub fn is_excluded(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.names.contains(name.to_string_lossy().as_ref()))
            .unwrap_or(false)
    }

    /// Exclusions for the default database and log file names
    pub fn defaults() -> Self {
        Self::for_index(DEFAULT_DATABASE_NAME, DEFAULT_LOG_FILE)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// List every file under `root`, sorted, as absolute paths
pub fn enumerate(root: &Path, exclusions: &Exclusions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ChksumError::RootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if exclusions.is_excluded(entry.path()) {
            skipped += 1;
            continue;
        }

        files.push(entry.into_path());
    }

    files.sort();

    debug!(
        "Enumerated {} file(s) under {} ({} excluded)",
        files.len(),
        root.display(),
        skipped
    );

    Ok(files)
}
