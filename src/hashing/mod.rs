//! Content hashing module
//!
//! # Submodules
//!
//! - `fingerprint` - Algorithm tags and the unified fingerprint type
//! - `engine` - Streaming file hashing and parallel batch hashing

pub mod engine;
pub mod fingerprint;

pub use engine::{
    hash_bytes, hash_file, hash_many, parse_buffer_size, parse_thread_count, HashBatch,
    HashOptions, HashProgress, HashedFile,
};
pub use fingerprint::{Digest, Fingerprint, HashAlgorithm};
