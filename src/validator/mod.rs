//! Path Validator
//!
//! Combines the commitment check and the speed check into one decision.
//!
//! ```text
//! (payer, proof, path)
//!        │
//!        ├── core::hash      chained digest ──► commitment: digest == proof
//!        ├── speed.rs        step magnitudes ─► every step ≤ max_step
//!        │
//!        ▼
//!   outcome.rs  (proof_valid, speed_valid) ─► Accepted | ProofMismatch
//!        │                                   | SpeedViolation | CombinedFailure
//!        ▼
//!   ledger::fee  (Accepted only) ─► fee moved to treasury
//! ```

pub mod engine;
pub mod outcome;
pub mod speed;

pub use engine::{PathAssessment, PathValidator, ValidationError, ValidationReceipt};
pub use outcome::{resolve, ValidationOutcome};
pub use speed::{SpeedPolicy, SpeedReport, DEFAULT_MAX_STEP};
