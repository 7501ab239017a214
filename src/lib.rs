//! # Path Validator
//!
//! Dual-check validation for client-submitted movement paths.
//!
//! A client submits a path (raw bytes, two per sample) together with a
//! 32-byte proof: the chained digest it claims for that path. The validator
//! recomputes the digest, checks that no step between consecutive samples
//! exceeds the speed bound, and collects a fixed fee only when both pass.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PATH VALIDATOR                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure primitives                           │
//! │  ├── hash.rs     - Chained chunk digest (Keccak/SHA-256)     │
//! │  └── path.rs     - Path bytes and sample decoding            │
//! │                                                              │
//! │  proof/          - Commitments                               │
//! │  └── commitment.rs - Constant-time proof comparison          │
//! │                                                              │
//! │  validator/      - Decision                                  │
//! │  ├── speed.rs    - Step bound evaluation                     │
//! │  ├── outcome.rs  - (proof, speed) -> outcome table           │
//! │  └── engine.rs   - validate(): checks, outcome, fee          │
//! │                                                              │
//! │  ledger/         - Balances behind the FeeLedger trait       │
//! │  ├── fee.rs      - Fee gate and receipts                     │
//! │  └── memory.rs   - In-memory ledger                          │
//! │                                                              │
//! │  network/        - Submission endpoint (non-deterministic)   │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── auth.rs     - JWT payer authentication                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - The digest is a pure fold over 32-byte chunks: same bytes, same digest.
//! - Every submission resolves to exactly one outcome.
//! - The fee moves only on `Accepted`, and either fully or not at all.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod ledger;
pub mod network;
pub mod proof;
pub mod validator;

// Re-export commonly used types
pub use config::{ConfigError, ValidatorConfig};
pub use core::hash::{chained_digest, HashScheme, PathDigest};
pub use core::path::{Path, PathError, SampleLayout};
pub use ledger::{AccountId, FeeLedger, InMemoryLedger, LedgerError};
pub use validator::{PathValidator, ValidationError, ValidationOutcome, ValidationReceipt};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
