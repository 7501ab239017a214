//! Path Commitments
//!
//! Clients publish the chained digest of a path before submitting it;
//! the validator recomputes it and compares in constant time.

pub mod commitment;

pub use commitment::{digests_match, proof_valid, PathCommitment};
