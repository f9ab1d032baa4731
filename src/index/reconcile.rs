//! Reconciliation Engine
//!
//! Classifies freshly hashed files against the index and applies the
//! resulting mutations. Identity is content: a known hash seen at a new path is
//! a move (renames and directory restructures included), a known hash seen at
//! its stored path is a re-observation, and an unknown hash is new content.
//!
//! Files sharing a hash within one batch are handled together so the outcome
//! does not depend on hashing order: the group is visited in path order, the
//! first path (or the stored path, if still present) becomes the record's
//! location and every other path is reported as a duplicate.

use crate::core::error::Result;
use crate::core::events::IndexEvent;
use crate::hashing::HashedFile;
use crate::index::store::IndexStore;
use log::{debug, info, trace};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One observed path, in stored form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Sighting {
    relative_path: String,
    file_name: String,
}

/// Applies hashed files to an index
pub struct Reconciler<'a> {
    store: &'a IndexStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a IndexStore) -> Self {
        Self { store }
    }

    /// Reconcile a batch of hashed files, returning one event per mutation or
    /// duplicate sighting.
    pub fn reconcile(&self, files: Vec<HashedFile>) -> Result<Vec<IndexEvent>> {
        let groups = self.group_by_hash(files)?;
        let mut events = Vec::new();

        for (hash, sightings) in groups {
            self.reconcile_group(&hash, sightings, &mut events)?;
        }

        info!(
            "Reconciled {} event(s) against {}",
            events.len(),
            self.store.database_path().display()
        );

        Ok(events)
    }

    fn group_by_hash(
        &self,
        files: Vec<HashedFile>,
    ) -> Result<BTreeMap<String, BTreeSet<Sighting>>> {
        let mut groups: BTreeMap<String, BTreeSet<Sighting>> = BTreeMap::new();

        for file in files {
            let sighting = Sighting {
                relative_path: self.store.relative_path(&file.path)?,
                file_name: file_name_of(&file.path),
            };
            groups
                .entry(file.fingerprint.to_hex())
                .or_default()
                .insert(sighting);
        }

        Ok(groups)
    }

    fn reconcile_group(
        &self,
        hash: &str,
        sightings: BTreeSet<Sighting>,
        events: &mut Vec<IndexEvent>,
    ) -> Result<()> {
        let mut sightings: Vec<Sighting> = sightings.into_iter().collect();
        if sightings.is_empty() {
            return Ok(());
        }

        let original = match self.store.lookup_by_hash(hash)? {
            Some(record) if record.relative_path.is_empty() => {
                let first = sightings.remove(0);
                self.store.update_path(hash, &first.relative_path)?;
                debug!("New (path was empty): {} at {}", hash, first.relative_path);
                events.push(IndexEvent::New {
                    hash: hash.to_string(),
                    path: first.relative_path.clone(),
                });
                first.relative_path
            }
            Some(record) => {
                if let Some(pos) = sightings
                    .iter()
                    .position(|s| s.relative_path == record.relative_path)
                {
                    sightings.remove(pos);
                    trace!("Unchanged: {} at {}", hash, record.relative_path);
                    record.relative_path
                } else {
                    let first = sightings.remove(0);
                    self.store.update_path(hash, &first.relative_path)?;
                    debug!(
                        "Moved: {} from {} to {}",
                        hash, record.relative_path, first.relative_path
                    );
                    events.push(IndexEvent::Moved {
                        hash: hash.to_string(),
                        from: record.relative_path,
                        to: first.relative_path.clone(),
                    });
                    first.relative_path
                }
            }
            None => {
                let first = sightings.remove(0);
                self.store
                    .insert(hash, &first.file_name, &first.relative_path)?;
                debug!("New: {} at {}", hash, first.relative_path);
                events.push(IndexEvent::New {
                    hash: hash.to_string(),
                    path: first.relative_path.clone(),
                });
                first.relative_path
            }
        };

        for duplicate in sightings {
            debug!(
                "Duplicate: {} is identical to {}",
                duplicate.relative_path, original
            );
            events.push(IndexEvent::Duplicate {
                hash: hash.to_string(),
                path: duplicate.relative_path,
                original: original.clone(),
            });
        }

        Ok(())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ChksumError;
    use crate::hashing::{hash_bytes, HashOptions};
    use tempfile::TempDir;

    fn setup() -> (TempDir, IndexStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::open(temp_dir.path(), "chksum.db").unwrap();
        (temp_dir, store)
    }

    fn hashed(root: &Path, rel: &str, content: &[u8]) -> HashedFile {
        HashedFile::new(root.join(rel), hash_bytes(content, &HashOptions::default()))
    }

    fn hex(content: &[u8]) -> String {
        hash_bytes(content, &HashOptions::default()).to_hex()
    }

    #[test]
    fn test_new_content_is_inserted() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();

        let events = Reconciler::new(&store)
            .reconcile(vec![hashed(root, "docs/a.txt", b"alpha")])
            .unwrap();

        assert_eq!(
            events,
            vec![IndexEvent::New {
                hash: hex(b"alpha"),
                path: "docs/a.txt".into(),
            }]
        );

        let record = store.lookup_by_hash(&hex(b"alpha")).unwrap().unwrap();
        assert_eq!(record.file_name, "a.txt");
        assert_eq!(record.relative_path, "docs/a.txt");
    }

    #[test]
    fn test_reobservation_is_silent() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();
        let reconciler = Reconciler::new(&store);

        reconciler
            .reconcile(vec![hashed(root, "a.txt", b"alpha")])
            .unwrap();
        let events = reconciler
            .reconcile(vec![hashed(root, "a.txt", b"alpha")])
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_move_updates_record() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();
        let reconciler = Reconciler::new(&store);

        reconciler
            .reconcile(vec![hashed(root, "old/a.txt", b"alpha")])
            .unwrap();
        let events = reconciler
            .reconcile(vec![hashed(root, "new/renamed.txt", b"alpha")])
            .unwrap();

        assert_eq!(
            events,
            vec![IndexEvent::Moved {
                hash: hex(b"alpha"),
                from: "old/a.txt".into(),
                to: "new/renamed.txt".into(),
            }]
        );
        let record = store.lookup_by_hash(&hex(b"alpha")).unwrap().unwrap();
        assert_eq!(record.relative_path, "new/renamed.txt");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_duplicates_in_one_batch() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();

        let events = Reconciler::new(&store)
            .reconcile(vec![
                hashed(root, "z/copy.txt", b"same"),
                hashed(root, "a/orig.txt", b"same"),
            ])
            .unwrap();

        assert_eq!(
            events,
            vec![
                IndexEvent::New {
                    hash: hex(b"same"),
                    path: "a/orig.txt".into(),
                },
                IndexEvent::Duplicate {
                    hash: hex(b"same"),
                    path: "z/copy.txt".into(),
                    original: "a/orig.txt".into(),
                },
            ]
        );
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_of_stored_path_is_not_a_move() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();
        let reconciler = Reconciler::new(&store);

        reconciler
            .reconcile(vec![hashed(root, "m/orig.txt", b"same")])
            .unwrap();
        let events = reconciler
            .reconcile(vec![
                hashed(root, "a/copy.txt", b"same"),
                hashed(root, "m/orig.txt", b"same"),
            ])
            .unwrap();

        assert_eq!(
            events,
            vec![IndexEvent::Duplicate {
                hash: hex(b"same"),
                path: "a/copy.txt".into(),
                original: "m/orig.txt".into(),
            }]
        );
        let record = store.lookup_by_hash(&hex(b"same")).unwrap().unwrap();
        assert_eq!(record.relative_path, "m/orig.txt");
    }

    #[test]
    fn test_empty_stored_path_is_treated_as_new() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();
        store.insert(&hex(b"alpha"), "a.txt", "").unwrap();

        let events = Reconciler::new(&store)
            .reconcile(vec![hashed(root, "a.txt", b"alpha")])
            .unwrap();

        assert_eq!(
            events,
            vec![IndexEvent::New {
                hash: hex(b"alpha"),
                path: "a.txt".into(),
            }]
        );
        let record = store.lookup_by_hash(&hex(b"alpha")).unwrap().unwrap();
        assert_eq!(record.relative_path, "a.txt");
    }

    #[test]
    fn test_path_outside_root_is_rejected() {
        let (_temp_dir, store) = setup();
        let outside = TempDir::new().unwrap();

        let err = Reconciler::new(&store)
            .reconcile(vec![hashed(outside.path(), "x.txt", b"x")])
            .unwrap_err();

        assert!(matches!(err, ChksumError::OutsideRoot(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_events_follow_hash_order() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();

        let events = Reconciler::new(&store)
            .reconcile(vec![
                hashed(root, "one.txt", b"one"),
                hashed(root, "two.txt", b"two"),
                hashed(root, "three.txt", b"three"),
            ])
            .unwrap();

        let hashes: Vec<&str> = events.iter().map(IndexEvent::hash).collect();
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);
        assert_eq!(store.len().unwrap(), 3);
    }
}
