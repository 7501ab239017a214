//! Path Validation API
//!
//! Runs both integrity checks on a submitted path, resolves the outcome,
//! and collects the fee only for accepted paths.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ValidatorConfig;
use crate::core::hash::{PathDigest, PathHasher};
use crate::core::path::{Path, PathError};
use crate::ledger::{AccountId, FeeGate, FeeLedger, FeeReceipt, LedgerError};
use crate::proof::commitment::digests_match;
use crate::validator::outcome::ValidationOutcome;
use crate::validator::speed::{SpeedPolicy, SpeedReport};

/// Errors returned by [`PathValidator::validate`].
///
/// Every rejection is a distinct variant so callers can tell which guarantee failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Path has zero length.
    #[error("path is empty")]
    EmptyPath,

    /// Path length is not a whole number of samples.
    #[error("path length {0} is not a multiple of 2")]
    OddPathLength(usize),

    /// Proof does not match the path; speed is within bounds.
    #[error("Incorrect path")]
    ProofMismatch,

    /// Proof matches; a step exceeded the speed bound.
    #[error("Max speed exceeded: {max_speed} > {limit}")]
    SpeedViolation {
        /// Largest step observed.
        max_speed: u32,
        /// Configured bound.
        limit: u32,
    },

    /// Proof does not match and a step exceeded the speed bound.
    #[error("Incorrect path and max speed exceeded: {max_speed} > {limit}")]
    CombinedFailure {
        /// Largest step observed.
        max_speed: u32,
        /// Configured bound.
        limit: u32,
    },

    /// Path was accepted but the fee could not be collected.
    #[error("fee transfer failed: {0}")]
    FeeTransferFailed(#[from] LedgerError),
}

impl ValidationError {
    /// Stable numeric error code.
    ///
    /// The three check failures keep the codes existing clients already match on.
    pub fn code(&self) -> u32 {
        match self {
            Self::ProofMismatch => 6000,
            Self::SpeedViolation { .. } => 6001,
            Self::CombinedFailure { .. } => 6002,
            Self::EmptyPath => 6003,
            Self::OddPathLength(_) => 6004,
            Self::FeeTransferFailed(_) => 6005,
        }
    }

    /// Outcome behind this error, if the path was rejected by the checks.
    ///
    /// A failed fee transfer has no outcome: the path is never reported as accepted.
    pub fn outcome(&self) -> Option<ValidationOutcome> {
        match self {
            Self::ProofMismatch => Some(ValidationOutcome::ProofMismatch),
            Self::SpeedViolation { .. } => Some(ValidationOutcome::SpeedViolation),
            Self::CombinedFailure { .. } => Some(ValidationOutcome::CombinedFailure),
            Self::FeeTransferFailed(_) | Self::EmptyPath | Self::OddPathLength(_) => None,
        }
    }
}

impl From<PathError> for ValidationError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Empty => Self::EmptyPath,
            PathError::OddLength(len) => Self::OddPathLength(len),
        }
    }
}

/// Both verdicts for a path, before any side effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAssessment {
    /// Digest the validator computed.
    pub digest: PathDigest,
    /// Whether it matched the proof.
    pub proof_valid: bool,
    /// Speed diagnostics.
    pub speed: SpeedReport,
    /// Resolved outcome.
    pub outcome: ValidationOutcome,
}

impl PathAssessment {
    /// Turn a rejected assessment into its error.
    pub fn into_result(self, limit: u32) -> Result<Self, ValidationError> {
        let max_speed = self.speed.max_speed;
        match self.outcome {
            ValidationOutcome::Accepted => Ok(self),
            ValidationOutcome::ProofMismatch => Err(ValidationError::ProofMismatch),
            ValidationOutcome::SpeedViolation => {
                Err(ValidationError::SpeedViolation { max_speed, limit })
            }
            ValidationOutcome::CombinedFailure => {
                Err(ValidationError::CombinedFailure { max_speed, limit })
            }
        }
    }
}

/// Record of an accepted path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReceipt {
    /// Per-call identifier, for log correlation.
    pub submission_id: Uuid,
    /// Digest of the accepted path.
    pub digest: PathDigest,
    /// Largest step in the path.
    pub max_speed: u32,
    /// Samples in the path.
    pub sample_count: usize,
    /// Fee collected.
    pub fee: FeeReceipt,
    /// When validation completed.
    pub accepted_at: DateTime<Utc>,
}

/// The dual-check path validator.
///
/// Holds configuration only; each call's path, proof and digest stay local to that call.
pub struct PathValidator<L: FeeLedger + ?Sized> {
    hasher: PathHasher,
    speed: SpeedPolicy,
    fee_gate: FeeGate,
    ledger: Arc<L>,
}

impl<L: FeeLedger + ?Sized> Clone for PathValidator<L> {
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher,
            speed: self.speed,
            fee_gate: self.fee_gate,
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: FeeLedger + ?Sized> PathValidator<L> {
    /// Create a validator from config and a ledger.
    pub fn new(config: &ValidatorConfig, ledger: Arc<L>) -> Self {
        Self {
            hasher: PathHasher::new(config.hash_scheme),
            speed: config.speed_policy(),
            fee_gate: config.fee_gate(),
            ledger,
        }
    }

    /// Speed policy in use.
    pub fn speed_policy(&self) -> SpeedPolicy {
        self.speed
    }

    /// Fee gate in use.
    pub fn fee_gate(&self) -> FeeGate {
        self.fee_gate
    }

    /// Ledger handle.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Run both checks without touching the ledger.
    pub fn assess(&self, proof: &PathDigest, bytes: &[u8]) -> Result<PathAssessment, ValidationError> {
        let path = Path::parse(bytes)?;

        let digest = self.hasher.digest(path.as_bytes())?;
        let proof_valid = digests_match(&digest, proof);
        let speed = self.speed.evaluate(&path);
        let outcome = ValidationOutcome::resolve(proof_valid, speed.is_valid());

        debug!("Computed hash: {}", hex::encode(digest));
        debug!("Max speed: {} (limit {})", speed.max_speed, self.speed.max_step);

        Ok(PathAssessment { digest, proof_valid, speed, outcome })
    }

    /// Validate a submission and collect the fee on acceptance.
    ///
    /// Either the path is accepted and the fee collected, or the call fails with
    /// exactly one error and the ledger is untouched.
    #[instrument(skip_all, fields(payer = %payer.short(), len = bytes.len()))]
    pub fn validate(
        &self,
        payer: &AccountId,
        proof: &PathDigest,
        bytes: &[u8],
    ) -> Result<ValidationReceipt, ValidationError> {
        let submission_id = Uuid::new_v4();

        let assessment = self.assess(proof, bytes).map_err(|e| {
            warn!(%submission_id, "Malformed path: {}", e);
            e
        })?;

        let assessment = assessment.into_result(self.speed.max_step).map_err(|e| {
            warn!(%submission_id, code = e.code(), "Path rejected: {}", e);
            e
        })?;

        let fee = self.fee_gate.collect(self.ledger.as_ref(), payer)?;

        info!(
            %submission_id,
            "Path accepted: {} samples, max speed {}, fee {}",
            bytes.len() / 2, assessment.speed.max_speed, fee.amount
        );

        Ok(ValidationReceipt {
            submission_id,
            digest: assessment.digest,
            max_speed: assessment.speed.max_speed,
            sample_count: bytes.len() / 2,
            fee,
            accepted_at: Utc::now(),
        })
    }
}
