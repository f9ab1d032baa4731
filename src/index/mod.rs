//! Content index module
//!
//! # Submodules
//!
//! - `store` - SQLite-backed hash to location mapping
//! - `reconcile` - Classification of hashed files as new, moved or duplicate
//! - `sweep` - Removal of records whose file is gone
//! - `diff` - Content present in one index and missing from another

pub mod diff;
pub mod reconcile;
pub mod store;
pub mod sweep;

pub use diff::{diff, diff_against, missing_records};
pub use reconcile::Reconciler;
pub use store::{IndexRecord, IndexStore, RecordMetadata};
pub use sweep::sweep;
