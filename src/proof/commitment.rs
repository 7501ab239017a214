//! Path Commitment Protocol
//!
//! The client commits to a path digest before submitting the path itself.
//! On submission the validator recomputes the digest and compares it with
//! the claimed proof.

use serde::{Serialize, Deserialize};
use subtle::ConstantTimeEq;

use crate::core::hash::{chained_digest, HashScheme, PathDigest};
use crate::core::path::PathError;

/// A published commitment to a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCommitment {
    /// Chained digest of the committed path.
    pub digest: PathDigest,

    /// Hash function the digest was produced with.
    pub scheme: HashScheme,
}

impl PathCommitment {
    /// Commit to `path`. This is what a client computes before submitting.
    pub fn commit(scheme: HashScheme, path: &[u8]) -> Result<Self, PathError> {
        Ok(Self {
            digest: chained_digest(scheme, path)?,
            scheme,
        })
    }

    /// Wrap a digest received from a client.
    pub const fn from_digest(scheme: HashScheme, digest: PathDigest) -> Self {
        Self { digest, scheme }
    }

    /// Check that `path` hashes to this commitment.
    pub fn verify(&self, path: &[u8]) -> Result<bool, PathError> {
        proof_valid(self.scheme, path, &self.digest)
    }

    /// Digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Compare a computed digest with a claimed proof in constant time.
#[inline]
pub fn digests_match(computed: &PathDigest, proof: &PathDigest) -> bool {
    computed[..].ct_eq(&proof[..]).into()
}

/// Recompute the digest of `path` and compare it with `proof`.
pub fn proof_valid(scheme: HashScheme, path: &[u8], proof: &PathDigest) -> Result<bool, PathError> {
    let computed = chained_digest(scheme, path)?;
    Ok(digests_match(&computed, proof))
}
