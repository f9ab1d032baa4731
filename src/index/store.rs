//! Content Index Store
//!
//! Persistent mapping from content hash to the current location of that
//! content, kept in a SQLite database inside the index root.
//!
//! Every operation is a single autocommitted statement: there are no
//! multi-record transactions, so an interrupted run leaves every already
//! applied insert or update in place.
//!
//! Paths are stored relative to the root with `/` separators, which keeps an
//! index valid when the whole tree is moved or copied to another platform.

use crate::core::error::{ChksumError, Result};
use crate::hashing::HashAlgorithm;
use log::{debug, trace};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS file (
        content_hash    TEXT NOT NULL PRIMARY KEY,
        file_name       TEXT NOT NULL,
        relative_path   TEXT NOT NULL,
        artist          TEXT,
        playback_length INTEGER
    );
    CREATE TABLE IF NOT EXISTS index_meta (
        key   TEXT NOT NULL PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const RECORD_COLUMNS: &str = "content_hash, file_name, relative_path, artist, playback_length";

const ALGORITHM_KEY: &str = "algorithm";

const BUFFER_SIZE_KEY: &str = "buffer_size";

/// Optional descriptive fields. Never written by a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    pub artist: Option<String>,
    pub playback_length: Option<i64>,
}

/// One indexed piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub content_hash: String,
    pub file_name: String,
    pub relative_path: String,
    pub metadata: RecordMetadata,
}

impl IndexRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_hash: row.get(0)?,
            file_name: row.get(1)?,
            relative_path: row.get(2)?,
            metadata: RecordMetadata {
                artist: row.get(3)?,
                playback_length: row.get(4)?,
            },
        })
    }
}

/// Handle on one index database
pub struct IndexStore {
    conn: Connection,
    root: PathBuf,
    database_path: PathBuf,
    read_only: bool,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("root", &self.root)
            .field("database_path", &self.database_path)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl IndexStore {
    /// Open the index in `root`, creating the database and schema if absent.
    ///
    /// Opening an existing index never re-initializes it.
    pub fn open(root: &Path, database_name: &str) -> Result<Self> {
        if !root.is_dir() {
            return Err(ChksumError::RootNotFound(root.to_path_buf()));
        }

        let database_path = root.join(database_name);
        let existed = database_path.exists();

        let conn = Connection::open(&database_path)?;
        conn.execute_batch(SCHEMA)?;

        if existed {
            debug!("Opened index at {}", database_path.display());
        } else {
            debug!("Created index at {}", database_path.display());
        }

        Ok(Self {
            conn,
            root: root.to_path_buf(),
            database_path,
            read_only: false,
        })
    }

    /// Open an already built index read-only.
    ///
    /// The root of the opened index is the directory holding the database.
    pub fn open_existing(database_path: &Path) -> Result<Self> {
        if !database_path.is_file() {
            return Err(ChksumError::IndexNotFound(database_path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(database_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|_| ChksumError::IndexNotFound(database_path.to_path_buf()))?;

        let has_table: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'file'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|_| ChksumError::IndexNotFound(database_path.to_path_buf()))?;

        if has_table.is_none() {
            return Err(ChksumError::IndexNotFound(database_path.to_path_buf()));
        }

        let root = database_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!("Opened index {} read-only", database_path.display());

        Ok(Self {
            conn,
            root,
            database_path: database_path.to_path_buf(),
            read_only: true,
        })
    }

    /// Look up the record for a content hash
    pub fn lookup_by_hash(&self, hash: &str) -> Result<Option<IndexRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM file WHERE content_hash = ?1", RECORD_COLUMNS),
                params![hash],
                IndexRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Insert a new record. Fails with `DuplicateKey` if the hash is indexed.
    pub fn insert(&self, hash: &str, file_name: &str, relative_path: &str) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO file (content_hash, file_name, relative_path) VALUES (?1, ?2, ?3)",
            params![hash, file_name, relative_path],
        );

        match result {
            Ok(_) => {
                trace!("Inserted {} at {}", hash, relative_path);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(ChksumError::DuplicateKey(hash.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Point an existing record at a new path. Fails with `MissingRecord` if
    /// the hash is not indexed.
    pub fn update_path(&self, hash: &str, new_relative_path: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE file SET relative_path = ?1 WHERE content_hash = ?2",
            params![new_relative_path, hash],
        )?;

        if changed == 0 {
            return Err(ChksumError::MissingRecord(hash.to_string()));
        }

        trace!("Updated {} to {}", hash, new_relative_path);
        Ok(())
    }

    /// Remove a record. Returns whether a record was removed.
    pub fn delete(&self, hash: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM file WHERE content_hash = ?1", params![hash])?;
        trace!("Deleted {} ({} row(s))", hash, changed);
        Ok(changed > 0)
    }

    /// Every record, ordered by hash
    pub fn list_all(&self) -> Result<Vec<IndexRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM file ORDER BY content_hash",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map([], IndexRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Every indexed hash
    pub fn hashes(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT content_hash FROM file")?;
        let hashes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(hashes)
    }

    /// Number of records
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reclaim space left by deleted records
    pub fn compact(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM")?;
        debug!("Compacted {}", self.database_path.display());
        Ok(())
    }

    /// Algorithm the index was built with, if recorded
    pub fn algorithm(&self) -> Result<Option<HashAlgorithm>> {
        self.meta(ALGORITHM_KEY)?
            .map(|name| name.parse::<HashAlgorithm>())
            .transpose()
    }

    /// Remember the algorithm the index is built with
    pub fn record_algorithm(&self, algorithm: HashAlgorithm) -> Result<()> {
        self.set_meta(ALGORITHM_KEY, algorithm.name())
    }

    /// Chunk size the index's fingerprints were folded over, if recorded.
    /// Only meaningful for the non-cryptographic algorithms.
    pub fn buffer_size(&self) -> Result<Option<usize>> {
        self.meta(BUFFER_SIZE_KEY)?
            .map(|raw| {
                raw.parse::<usize>()
                    .map_err(|_| ChksumError::InvalidBufferSize(raw.clone()))
            })
            .transpose()
    }

    /// Remember the chunk size the index is built with
    pub fn record_buffer_size(&self, buffer_size: usize) -> Result<()> {
        self.set_meta(BUFFER_SIZE_KEY, &buffer_size.to_string())
    }

    fn meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Stored (root-relative, `/`-separated) form of an absolute path.
    ///
    /// Paths that are not valid UTF-8 are rejected: a lossy conversion would
    /// store a location that `resolve` can never find again.
    pub fn relative_path(&self, absolute: &Path) -> Result<String> {
        let relative = absolute
            .strip_prefix(&self.root)
            .map_err(|_| ChksumError::OutsideRoot(absolute.to_path_buf()))?;

        let mut parts = Vec::new();
        for component in relative.components() {
            if let Component::Normal(part) = component {
                let part = part
                    .to_str()
                    .ok_or_else(|| ChksumError::NonUtf8Path(absolute.to_path_buf()))?;
                parts.push(part);
            }
        }

        Ok(parts.join("/"))
    }

    /// Absolute location of a stored path
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        relative_path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, IndexStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::open(temp_dir.path(), "chksum.db").unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_open_creates_database() {
        let (temp_dir, store) = open_temp();
        assert!(temp_dir.path().join("chksum.db").exists());
        assert!(store.is_empty().unwrap());
        assert!(!store.is_read_only());
    }

    #[test]
    fn test_open_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = IndexStore::open(temp_dir.path(), "chksum.db").unwrap();
            store.insert("h1", "a.txt", "a.txt").unwrap();
        }

        let store = IndexStore::open(temp_dir.path(), "chksum.db").unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.lookup_by_hash("h1").unwrap().is_some());
    }

    #[test]
    fn test_open_missing_root() {
        let err = IndexStore::open(Path::new("/nonexistent/root"), "chksum.db").unwrap_err();
        assert!(matches!(err, ChksumError::RootNotFound(_)));
    }

    #[test]
    fn test_insert_and_lookup() {
        let (_temp_dir, store) = open_temp();
        store.insert("h1", "a.txt", "docs/a.txt").unwrap();

        let record = store.lookup_by_hash("h1").unwrap().unwrap();
        assert_eq!(record.content_hash, "h1");
        assert_eq!(record.file_name, "a.txt");
        assert_eq!(record.relative_path, "docs/a.txt");
        assert_eq!(record.metadata, RecordMetadata::default());

        assert!(store.lookup_by_hash("h2").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_key() {
        let (_temp_dir, store) = open_temp();
        store.insert("h1", "a.txt", "a.txt").unwrap();

        let err = store.insert("h1", "b.txt", "b.txt").unwrap_err();
        assert!(matches!(err, ChksumError::DuplicateKey(hash) if hash == "h1"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_update_path() {
        let (_temp_dir, store) = open_temp();
        store.insert("h1", "a.txt", "old/a.txt").unwrap();
        store.update_path("h1", "new/a.txt").unwrap();

        let record = store.lookup_by_hash("h1").unwrap().unwrap();
        assert_eq!(record.relative_path, "new/a.txt");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_update_missing_record() {
        let (_temp_dir, store) = open_temp();
        let err = store.update_path("nope", "a.txt").unwrap_err();
        assert!(matches!(err, ChksumError::MissingRecord(_)));
    }

    #[test]
    fn test_delete_and_list() {
        let (_temp_dir, store) = open_temp();
        store.insert("h2", "b.txt", "b.txt").unwrap();
        store.insert("h1", "a.txt", "a.txt").unwrap();

        let hashes: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.content_hash)
            .collect();
        assert_eq!(hashes, vec!["h1", "h2"]);

        assert!(store.delete("h1").unwrap());
        assert!(!store.delete("h1").unwrap());
        assert_eq!(store.hashes().unwrap().into_iter().collect::<Vec<_>>(), vec!["h2"]);
    }

    #[test]
    fn test_compact_keeps_records() {
        let (_temp_dir, store) = open_temp();
        for i in 0..50 {
            store
                .insert(&format!("h{}", i), "f.txt", &format!("f{}.txt", i))
                .unwrap();
        }
        for i in 0..40 {
            store.delete(&format!("h{}", i)).unwrap();
        }

        store.compact().unwrap();
        assert_eq!(store.len().unwrap(), 10);
    }

    #[test]
    fn test_algorithm_metadata() {
        let (_temp_dir, store) = open_temp();
        assert_eq!(store.algorithm().unwrap(), None);

        store.record_algorithm(HashAlgorithm::Xxh64).unwrap();
        assert_eq!(store.algorithm().unwrap(), Some(HashAlgorithm::Xxh64));

        store.record_algorithm(HashAlgorithm::Sha256).unwrap();
        assert_eq!(store.algorithm().unwrap(), Some(HashAlgorithm::Sha256));
    }

    #[test]
    fn test_buffer_size_metadata() {
        let (_temp_dir, store) = open_temp();
        assert_eq!(store.buffer_size().unwrap(), None);

        store.record_buffer_size(4096).unwrap();
        assert_eq!(store.buffer_size().unwrap(), Some(4096));

        store.record_buffer_size(65536).unwrap();
        assert_eq!(store.buffer_size().unwrap(), Some(65536));
        assert_eq!(store.algorithm().unwrap(), None);
    }

    #[test]
    fn test_open_existing_is_read_only() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = IndexStore::open(temp_dir.path(), "chksum.db").unwrap();
            store.insert("h1", "a.txt", "a.txt").unwrap();
        }

        let store = IndexStore::open_existing(&temp_dir.path().join("chksum.db")).unwrap();
        assert!(store.is_read_only());
        assert_eq!(store.root(), temp_dir.path());
        assert!(store.lookup_by_hash("h1").unwrap().is_some());
        assert!(store.insert("h2", "b.txt", "b.txt").is_err());
    }

    #[test]
    fn test_open_existing_missing_file() {
        let err = IndexStore::open_existing(Path::new("/nonexistent/chksum.db")).unwrap_err();
        assert!(matches!(err, ChksumError::IndexNotFound(_)));
    }

    #[test]
    fn test_open_existing_rejects_foreign_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.db");
        fs::write(&path, b"definitely not sqlite").unwrap();

        let err = IndexStore::open_existing(&path).unwrap_err();
        assert!(matches!(err, ChksumError::IndexNotFound(_)));
    }

    #[test]
    fn test_relative_path_and_resolve() {
        let (temp_dir, store) = open_temp();
        let absolute = temp_dir.path().join("music").join("live").join("track.flac");

        let relative = store.relative_path(&absolute).unwrap();
        assert_eq!(relative, "music/live/track.flac");
        assert_eq!(store.resolve(&relative), absolute);
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_path_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (temp_dir, store) = open_temp();
        let absolute = temp_dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));

        let err = store.relative_path(&absolute).unwrap_err();
        assert!(matches!(err, ChksumError::NonUtf8Path(path) if path == absolute));
    }

    #[test]
    fn test_relative_path_outside_root() {
        let (_temp_dir, store) = open_temp();
        let err = store.relative_path(Path::new("/elsewhere/file.txt")).unwrap_err();
        assert!(matches!(err, ChksumError::OutsideRoot(_)));
    }
}
