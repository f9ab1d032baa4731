//! Deletion Sweep
//!
//! Removes records whose file no longer exists at the stored location. Only
//! the index is visited; the tree is never walked.

use crate::core::error::Result;
use crate::core::events::IndexEvent;
use crate::index::store::IndexStore;
use log::{debug, info};

/// Delete every record whose backing file is gone
pub fn sweep(store: &IndexStore) -> Result<Vec<IndexEvent>> {
    let records = store.list_all()?;
    let checked = records.len();
    let mut events = Vec::new();

    for record in records {
        let location = store.resolve(&record.relative_path);
        if location.is_file() {
            continue;
        }

        if store.delete(&record.content_hash)? {
            debug!(
                "Deleted: {} ({} no longer exists)",
                record.content_hash,
                location.display()
            );
            events.push(IndexEvent::Deleted {
                hash: record.content_hash,
                path: record.relative_path,
            });
        }
    }

    info!(
        "Sweep checked {} record(s), removed {}",
        checked,
        events.len()
    );

    Ok(events)
}
