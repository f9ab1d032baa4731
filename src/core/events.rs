//! Events and reports produced by scans and maintenance passes
//!
//! Every mutation the reconciliation engine or the deletion sweep applies to
//! the index is described by an [`IndexEvent`]. Files that could not be hashed
//! are described by a [`HashFailure`]. A [`ScanReport`] bundles both for one
//! scan run.

use serde::Serialize;
use std::path::PathBuf;

/// Classification of one observation against the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexEvent {
    /// Content seen for the first time
    New { hash: String, path: String },

    /// Known content found at a different path; the record now points there
    Moved { hash: String, from: String, to: String },

    /// A second file with content already indexed at `original`
    Duplicate {
        hash: String,
        path: String,
        original: String,
    },

    /// The recorded file no longer exists and the record was removed
    Deleted { hash: String, path: String },
}

impl IndexEvent {
    pub fn hash(&self) -> &str {
        match self {
            IndexEvent::New { hash, .. }
            | IndexEvent::Moved { hash, .. }
            | IndexEvent::Duplicate { hash, .. }
            | IndexEvent::Deleted { hash, .. } => hash,
        }
    }

    /// Short lowercase label for console output
    pub fn label(&self) -> &'static str {
        match self {
            IndexEvent::New { .. } => "new",
            IndexEvent::Moved { .. } => "moved",
            IndexEvent::Duplicate { .. } => "duplicate",
            IndexEvent::Deleted { .. } => "deleted",
        }
    }
}

/// A file whose fingerprint could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl HashFailure {
    pub fn new(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}

/// Result of one scan run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Files found under the root (after exclusions)
    pub files_found: usize,

    /// Files whose fingerprint was computed
    pub files_hashed: usize,

    /// Index mutations and duplicate sightings
    pub events: Vec<IndexEvent>,

    /// Files that could not be hashed
    pub failures: Vec<HashFailure>,
}

impl ScanReport {
    pub fn new_count(&self) -> usize {
        self.count(|e| matches!(e, IndexEvent::New { .. }))
    }

    pub fn moved_count(&self) -> usize {
        self.count(|e| matches!(e, IndexEvent::Moved { .. }))
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(|e| matches!(e, IndexEvent::Duplicate { .. }))
    }

    /// Whether the run changed the index
    pub fn changed_index(&self) -> bool {
        self.new_count() + self.moved_count() > 0
    }

    fn count<P: Fn(&IndexEvent) -> bool>(&self, predicate: P) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}
