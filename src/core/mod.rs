//! Core deterministic primitives.
//!
//! Everything here is a pure function of its inputs: the chained path
//! digest and the sample decoding the speed check runs on.

pub mod hash;
pub mod path;

// Re-export core types
pub use hash::{chained_digest, HashScheme, PathDigest, PathHasher, CHAIN_TAG, CHUNK_SIZE};
pub use path::{Path, PathError, Sample, SampleLayout};
