//! Hand-off buffer between the hashing phase and the persistence phase
//!
//! The scan only needs to stash (path, fingerprint) pairs and later drain all
//! of them; anything able to do that can sit between the two phases.

use crate::core::error::Result;
use crate::hashing::HashedFile;

/// Append/drain buffer for hashed files
pub trait PairQueue {
    /// Append pairs to the buffer
    fn stash(&mut self, files: Vec<HashedFile>) -> Result<()>;

    /// Remove and return every buffered pair, in stash order
    fn drain(&mut self) -> Result<Vec<HashedFile>>;

    /// Number of buffered pairs
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process queue
#[derive(Debug, Default)]
pub struct MemoryQueue {
    files: Vec<HashedFile>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PairQueue for MemoryQueue {
    fn stash(&mut self, files: Vec<HashedFile>) -> Result<()> {
        self.files.extend(files);
        Ok(())
    }

    fn drain(&mut self) -> Result<Vec<HashedFile>> {
        Ok(std::mem::take(&mut self.files))
    }

    fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::{hash_bytes, HashOptions};

    #[test]
    fn test_stash_then_drain() {
        let options = HashOptions::default();
        let mut queue = MemoryQueue::new();
        assert!(queue.is_empty());

        queue
            .stash(vec![HashedFile::new("/t/a", hash_bytes(b"a", &options))])
            .unwrap();
        queue
            .stash(vec![HashedFile::new("/t/b", hash_bytes(b"b", &options))])
            .unwrap();
        assert_eq!(queue.len(), 2);

        let drained = queue.drain().unwrap();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].path, std::path::PathBuf::from("/t/a"));
        assert!(queue.is_empty());
        assert!(queue.drain().unwrap().is_empty());
    }
}
