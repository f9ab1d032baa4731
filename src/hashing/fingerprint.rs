//! Fingerprint types shared by every hash algorithm
//!
//! A [`Fingerprint`] carries the algorithm that produced it together with an
//! opaque, ordered digest value, so the rest of the crate compares content
//! without caring which algorithm was used.

use crate::core::error::{ChksumError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported content hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, 32-byte cryptographic digest
    #[default]
    Sha256,
    /// xxHash32, fast non-cryptographic 32-bit hash
    Xxh32,
    /// xxHash64, fast non-cryptographic 64-bit hash
    Xxh64,
}

impl HashAlgorithm {
    /// All supported algorithms
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Xxh32,
        HashAlgorithm::Xxh64,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Xxh32 => "xxh32",
            HashAlgorithm::Xxh64 => "xxh64",
        }
    }

    /// Whether the algorithm is collision resistant
    pub fn is_cryptographic(&self) -> bool {
        matches!(self, HashAlgorithm::Sha256)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ChksumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "xxh32" | "xxhash32" => Ok(HashAlgorithm::Xxh32),
            "xxh64" | "xxhash64" => Ok(HashAlgorithm::Xxh64),
            _ => Err(ChksumError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Raw digest value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Digest {
    Sha256([u8; 32]),
    U32(u32),
    U64(u64),
}

/// Content fingerprint: algorithm tag plus digest value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    algorithm: HashAlgorithm,
    digest: Digest,
}

impl Fingerprint {
    pub fn new(algorithm: HashAlgorithm, digest: Digest) -> Self {
        Self { algorithm, digest }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Fixed-width lowercase hex rendering, used as the index key
    pub fn to_hex(&self) -> String {
        match &self.digest {
            Digest::Sha256(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            Digest::U32(value) => format!("{:08x}", value),
            Digest::U64(value) => format!("{:016x}", value),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
