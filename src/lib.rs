//! chksum Library
//!
//! A content-addressed file index. Every file under an index root is
//! identified by the hash of its bytes, and repeated scans reconcile what is
//! on disk against a SQLite index: new content is recorded, content found at a
//! different path is recorded as moved, and further copies are reported as
//! duplicates. Maintenance passes remove records of deleted files and compare
//! two indexes by content.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error handling, tree enumeration and the scan
//!   pipeline
//! - [`hashing`] - Streaming SHA-256 / xxHash fingerprints and parallel hashing
//! - [`index`] - The index store, reconciliation, deletion sweep and diff
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use chksum::core::enumerate::Exclusions;
//! use chksum::core::queue::MemoryQueue;
//! use chksum::core::scan::run_scan;
//! use chksum::hashing::HashOptions;
//! use chksum::index::{sweep, IndexStore};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = IndexStore::open(Path::new("/srv/media"), "chksum.db")?;
//!     let options = HashOptions::from_raw("sha256", "65536")?;
//!
//!     let mut queue = MemoryQueue::new();
//!     let report = run_scan(&store, &options, &Exclusions::defaults(), &mut queue, |_| {})?;
//!     println!("{} new, {} moved", report.new_count(), report.moved_count());
//!
//!     for event in sweep(&store)? {
//!         println!("{:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod hashing;
pub mod index;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
