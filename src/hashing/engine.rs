//! Hash Engine
//!
//! Computes content fingerprints by streaming files in fixed-size chunks.
//!
//! # Algorithms
//!
//! - **sha256**: a running SHA-256 state is fed every chunk and finalized once
//!   at end of stream.
//! - **xxh32 / xxh64**: each chunk is hashed with the previous chunk's result as
//!   its seed, starting from [`FOLD_SEED`]. The last value is the fingerprint,
//!   so these fingerprints depend on the buffer size.
//!
//! # Batches
//!
//! [`hash_many`] hashes a list of files on a bounded `rayon` pool. A file that
//! cannot be read is recorded as a [`HashFailure`] and the batch carries on.
//! The fingerprint map is assembled only after every worker has finished.
//!
//! # Example
//!
//! ```rust,no_run
//! use chksum::hashing::{hash_many, HashOptions};
//! use std::path::PathBuf;
//!
//! let options = HashOptions::from_raw("xxh64", "65536").unwrap();
//! let files = vec![PathBuf::from("/srv/media/a.flac")];
//! let batch = hash_many(&files, &options, |_| {}).unwrap();
//! for (path, fingerprint) in &batch.fingerprints {
//!     println!("{} {}", fingerprint, path.display());
//! }
//! ```

use crate::core::config::DEFAULT_BUFFER_SIZE;
use crate::core::error::{ChksumError, Result};
use crate::core::events::HashFailure;
use crate::hashing::fingerprint::{Digest, Fingerprint, HashAlgorithm};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use sha2::{Digest as _, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use xxhash_rust::xxh32::xxh32;
use xxhash_rust::xxh64::xxh64;

/// Seed for the first chunk of the non-cryptographic hashes
pub const FOLD_SEED: u32 = 123_456;

/// How often (in files) progress is reported
const PROGRESS_INTERVAL: usize = 100;

/// Validated hashing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOptions {
    algorithm: HashAlgorithm,
    buffer_size: usize,
    threads: usize,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            threads: 0,
        }
    }
}

impl HashOptions {
    /// Create options, rejecting a zero buffer size
    pub fn new(algorithm: HashAlgorithm, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(ChksumError::InvalidBufferSize(buffer_size.to_string()));
        }
        Ok(Self {
            algorithm,
            buffer_size,
            threads: 0,
        })
    }

    /// Create options from unvalidated text, as typed on a command line
    pub fn from_raw(algorithm: &str, buffer_size: &str) -> Result<Self> {
        let algorithm = algorithm.parse::<HashAlgorithm>()?;
        let buffer_size = parse_buffer_size(buffer_size)?;
        Self::new(algorithm, buffer_size)
    }

    /// Limit the number of hashing workers (0 = one per hardware thread)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

/// Parse a buffer size given as text. Only positive integers are accepted.
pub fn parse_buffer_size(raw: &str) -> Result<usize> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => {
            usize::try_from(value).map_err(|_| ChksumError::InvalidBufferSize(raw.to_string()))
        }
        _ => Err(ChksumError::InvalidBufferSize(raw.to_string())),
    }
}

/// Parse a worker thread count given as text
pub fn parse_thread_count(raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ChksumError::InvalidThreadCount(raw.to_string()))
}

/// A file together with its content fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

impl HashedFile {
    pub fn new(path: impl Into<PathBuf>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }
}

/// Progress information for batch hashing
#[derive(Debug, Clone)]
pub struct HashProgress {
    /// Number of files processed so far
    pub current: usize,
    /// Total files to process
    pub total: usize,
    /// File being processed
    pub current_file: Option<PathBuf>,
    /// Number of files successfully hashed
    pub hashed: usize,
    /// Number of files that could not be hashed
    pub errors: usize,
}

/// Outcome of hashing a batch of files
#[derive(Debug, Default)]
pub struct HashBatch {
    /// Fingerprint of every file that could be read
    pub fingerprints: BTreeMap<PathBuf, Fingerprint>,
    /// Files that could not be read
    pub failures: Vec<HashFailure>,
}

impl HashBatch {
    /// Consume the batch into (path, fingerprint) pairs, ordered by path
    pub fn into_files(self) -> (Vec<HashedFile>, Vec<HashFailure>) {
        let files = self
            .fingerprints
            .into_iter()
            .map(|(path, fingerprint)| HashedFile { path, fingerprint })
            .collect();
        (files, self.failures)
    }
}

/// Running state for one algorithm
enum StreamState {
    Sha256(Sha256),
    Xxh32(Option<u32>),
    Xxh64(Option<u64>),
}

impl StreamState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => StreamState::Sha256(Sha256::new()),
            HashAlgorithm::Xxh32 => StreamState::Xxh32(None),
            HashAlgorithm::Xxh64 => StreamState::Xxh64(None),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            StreamState::Sha256(hasher) => hasher.update(chunk),
            StreamState::Xxh32(state) => {
                let seed = state.unwrap_or(FOLD_SEED);
                *state = Some(xxh32(chunk, seed));
            }
            StreamState::Xxh64(state) => {
                let seed = state.unwrap_or(FOLD_SEED as u64);
                *state = Some(xxh64(chunk, seed));
            }
        }
    }

    fn finish(self) -> Digest {
        match self {
            StreamState::Sha256(hasher) => {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&hasher.finalize());
                Digest::Sha256(bytes)
            }
            StreamState::Xxh32(state) => {
                Digest::U32(state.unwrap_or_else(|| xxh32(&[], FOLD_SEED)))
            }
            StreamState::Xxh64(state) => {
                Digest::U64(state.unwrap_or_else(|| xxh64(&[], FOLD_SEED as u64)))
            }
        }
    }
}

/// Fill `buffer` from `reader`, stopping early only at end of stream.
///
/// Chunks must be exactly `buffer.len()` bytes (except the last) for the
/// folded hashes to be reproducible.
fn read_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compute the fingerprint of any byte stream
pub fn hash_reader<R: Read>(reader: &mut R, options: &HashOptions) -> Result<Fingerprint> {
    let mut state = StreamState::new(options.algorithm);
    let mut buffer = vec![0u8; options.buffer_size];

    loop {
        let bytes_read = read_chunk(reader, &mut buffer)
            .map_err(|e| ChksumError::IoError(format!("Failed to read file: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        state.update(&buffer[..bytes_read]);

        if bytes_read < buffer.len() {
            break;
        }
    }

    Ok(Fingerprint::new(options.algorithm, state.finish()))
}

/// Compute the fingerprint of a file using streaming (memory-efficient)
pub fn hash_file(path: &Path, options: &HashOptions) -> Result<Fingerprint> {
    let mut file = File::open(path)
        .map_err(|e| ChksumError::IoError(format!("Failed to open file: {}", e)))?;
    hash_reader(&mut file, options)
}

/// Compute the fingerprint of in-memory data
pub fn hash_bytes(data: &[u8], options: &HashOptions) -> Fingerprint {
    let mut state = StreamState::new(options.algorithm);
    for chunk in data.chunks(options.buffer_size) {
        state.update(chunk);
    }
    Fingerprint::new(options.algorithm, state.finish())
}

/// Hash a batch of files in parallel
///
/// # Arguments
/// * `paths` - Files to hash
/// * `options` - Algorithm, buffer size and worker limit
/// * `progress_callback` - Called periodically with progress updates
pub fn hash_many<F>(
    paths: &[PathBuf],
    options: &HashOptions,
    progress_callback: F,
) -> Result<HashBatch>
where
    F: Fn(HashProgress) + Send + Sync,
{
    let total = paths.len();
    if total == 0 {
        return Ok(HashBatch::default());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()
        .map_err(|e| ChksumError::ThreadPool(e.to_string()))?;

    info!(
        "Hashing {} file(s) with {} ({} byte chunks, {} workers)",
        total,
        options.algorithm,
        options.buffer_size,
        pool.current_num_threads()
    );

    let processed = AtomicUsize::new(0);
    let hashed = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);

    type Outcome = std::result::Result<(PathBuf, Fingerprint), HashFailure>;

    let results: Vec<Outcome> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let outcome = match hash_file(path, options) {
                    Ok(fingerprint) => {
                        hashed.fetch_add(1, Ordering::Relaxed);
                        trace!("{} {}", fingerprint, path.display());
                        Ok((path.clone(), fingerprint))
                    }
                    Err(e) => {
                        errors.fetch_add(1, Ordering::Relaxed);
                        warn!("Failed to hash {}: {}", path.display(), e);
                        Err(HashFailure::new(path.clone(), e.to_string()))
                    }
                };

                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if current % PROGRESS_INTERVAL == 0 || current == total {
                    progress_callback(HashProgress {
                        current,
                        total,
                        current_file: Some(path.clone()),
                        hashed: hashed.load(Ordering::Relaxed),
                        errors: errors.load(Ordering::Relaxed),
                    });
                }

                outcome
            })
            .collect()
    });

    let mut batch = HashBatch::default();
    for result in results {
        match result {
            Ok((path, fingerprint)) => {
                batch.fingerprints.insert(path, fingerprint);
            }
            Err(failure) => batch.failures.push(failure),
        }
    }
    batch.failures.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        "Hashed {} file(s), {} failure(s)",
        batch.fingerprints.len(),
        batch.failures.len()
    );

    Ok(batch)
}
