//! Chained Path Hashing
//!
//! Folds a path into a single 32-byte commitment:
//! - Fixed 32-byte chunks, consumed left to right
//! - Each step hashes `0x01 ‖ previous ‖ chunk`
//! - The first step has no previous digest
//!
//! The leading tag keeps the result distinct from a plain hash of the concatenated bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use super::path::PathError;

/// Hash output type (256 bits / 32 bytes)
pub type PathDigest = [u8; 32];

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Chunk stride used when folding a path.
pub const CHUNK_SIZE: usize = 32;

/// Domain separation tag prefixed to every chaining step.
pub const CHAIN_TAG: u8 = 0x01;

/// Hash function backing the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// Legacy Keccak-256, as produced by existing clients.
    #[default]
    Keccak256,
    /// SHA-256.
    Sha256,
}

impl HashScheme {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keccak256" | "keccak" => Ok(Self::Keccak256),
            "sha256" | "sha2" => Ok(Self::Sha256),
            other => Err(format!("unknown hash scheme '{}'", other)),
        }
    }
}

/// Chained hasher over path bytes.
///
/// Holds no state between calls; every `digest` is a pure function of its input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathHasher {
    scheme: HashScheme,
}

impl PathHasher {
    /// Create a hasher for the given scheme.
    pub const fn new(scheme: HashScheme) -> Self {
        Self { scheme }
    }

    /// Scheme in use.
    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Compute the chained digest of `bytes`.
    pub fn digest(&self, bytes: &[u8]) -> Result<PathDigest, PathError> {
        chained_digest(self.scheme, bytes)
    }
}

/// Compute the chained digest of `bytes` with `scheme`.
///
/// Returns `PathError::Empty` for zero-length input, since the chain has no first link.
pub fn chained_digest(scheme: HashScheme, bytes: &[u8]) -> Result<PathDigest, PathError> {
    let digest = match scheme {
        HashScheme::Keccak256 => fold_chunks::<Keccak256>(bytes),
        HashScheme::Sha256 => fold_chunks::<Sha256>(bytes),
    };
    digest.ok_or(PathError::Empty)
}

fn fold_chunks<D: Digest>(bytes: &[u8]) -> Option<PathDigest> {
    let mut acc: Option<PathDigest> = None;

    for chunk in bytes.chunks(CHUNK_SIZE) {
        let mut hasher = D::new();
        hasher.update([CHAIN_TAG]);
        if let Some(prev) = acc {
            hasher.update(prev);
        }
        hasher.update(chunk);

        let mut next = [0u8; DIGEST_LEN];
        next.copy_from_slice(&hasher.finalize());
        acc = Some(next);
    }

    acc
}

/// SHA-256 with a domain separator, for identifiers derived outside the chain.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> PathDigest {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

// =============================================================================
// TESTS
// =============================================================================
