//! Cross-Index Differ
//!
//! Reports content present in one index and absent from another. Neither index
//! is modified.

use crate::core::error::{ChksumError, Result};
use crate::index::store::{IndexRecord, IndexStore};
use log::{debug, info};
use std::path::Path;

/// Records of `primary` whose hash is not in `secondary`, ordered by hash
pub fn missing_records(primary: &IndexStore, secondary: &IndexStore) -> Result<Vec<IndexRecord>> {
    check_algorithms(primary, secondary)?;

    let secondary_hashes = secondary.hashes()?;
    let mut missing = Vec::new();

    for hash in primary.hashes()? {
        if secondary_hashes.contains(&hash) {
            continue;
        }
        if let Some(record) = primary.lookup_by_hash(&hash)? {
            missing.push(record);
        }
    }

    info!(
        "{} record(s) of {} are missing from {}",
        missing.len(),
        primary.database_path().display(),
        secondary.database_path().display()
    );

    Ok(missing)
}

/// File names of the content in `primary` but not in `secondary`
pub fn diff(primary: &IndexStore, secondary: &IndexStore) -> Result<Vec<String>> {
    Ok(missing_records(primary, secondary)?
        .into_iter()
        .map(|record| record.file_name)
        .collect())
}

/// Diff `primary` against the index database at `secondary_path`
pub fn diff_against(primary: &IndexStore, secondary_path: &Path) -> Result<Vec<IndexRecord>> {
    let secondary = IndexStore::open_existing(secondary_path)?;
    debug!("Comparing against {}", secondary_path.display());
    missing_records(primary, &secondary)
}

fn check_algorithms(primary: &IndexStore, secondary: &IndexStore) -> Result<()> {
    let (Some(ours), Some(theirs)) = (primary.algorithm()?, secondary.algorithm()?) else {
        return Ok(());
    };
    if ours != theirs {
        return Err(ChksumError::AlgorithmMismatch {
            index: theirs.to_string(),
            requested: ours.to_string(),
        });
    }
    if ours.is_cryptographic() {
        return Ok(());
    }

    // chunk-folded digests only agree when folded over the same chunk size
    if let (Some(our_size), Some(their_size)) = (primary.buffer_size()?, secondary.buffer_size()?)
    {
        if our_size != their_size {
            return Err(ChksumError::BufferSizeMismatch {
                algorithm: ours.to_string(),
                index: their_size,
                requested: our_size,
            });
        }
    }
    Ok(())
}
