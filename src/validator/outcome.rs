//! Outcome Resolution
//!
//! Folds the commitment verdict and the speed verdict into one of four outcomes.
//! A forged submission that fails both checks is reported as its own outcome,
//! never as either single-cause rejection.

use std::fmt;

use serde::{Serialize, Deserialize};

/// The combined verdict of one validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Proof matches and speed is within bounds.
    Accepted,
    /// Proof does not match; speed is within bounds.
    ProofMismatch,
    /// Proof matches; speed bound exceeded.
    SpeedViolation,
    /// Proof does not match and speed bound exceeded.
    CombinedFailure,
}

impl ValidationOutcome {
    /// All outcomes, in table order.
    pub const ALL: [Self; 4] = [
        Self::Accepted,
        Self::ProofMismatch,
        Self::SpeedViolation,
        Self::CombinedFailure,
    ];

    /// Map `(proof_valid, speed_valid)` to an outcome.
    pub const fn resolve(proof_valid: bool, speed_valid: bool) -> Self {
        match (proof_valid, speed_valid) {
            (true, true) => Self::Accepted,
            (false, true) => Self::ProofMismatch,
            (true, false) => Self::SpeedViolation,
            (false, false) => Self::CombinedFailure,
        }
    }

    /// Whether the fee gate may run.
    #[inline]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether the commitment check passed.
    pub const fn proof_valid(self) -> bool {
        matches!(self, Self::Accepted | Self::SpeedViolation)
    }

    /// Whether the speed check passed.
    pub const fn speed_valid(self) -> bool {
        matches!(self, Self::Accepted | Self::ProofMismatch)
    }

    /// Stable snake_case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::ProofMismatch => "proof_mismatch",
            Self::SpeedViolation => "speed_violation",
            Self::CombinedFailure => "combined_failure",
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-function form of [`ValidationOutcome::resolve`].
#[inline]
pub const fn resolve(proof_valid: bool, speed_valid: bool) -> ValidationOutcome {
    ValidationOutcome::resolve(proof_valid, speed_valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        assert_eq!(resolve(true, true), ValidationOutcome::Accepted);
        assert_eq!(resolve(false, true), ValidationOutcome::ProofMismatch);
        assert_eq!(resolve(true, false), ValidationOutcome::SpeedViolation);
        assert_eq!(resolve(false, false), ValidationOutcome::CombinedFailure);
    }

    #[test]
    fn test_outcomes_are_distinct() {
        let mut seen = std::collections::BTreeSet::new();
        for proof in [true, false] {
            for speed in [true, false] {
                seen.insert(resolve(proof, speed).as_str());
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_verdicts_round_trip() {
        for outcome in ValidationOutcome::ALL {
            assert_eq!(resolve(outcome.proof_valid(), outcome.speed_valid()), outcome);
        }
    }

    #[test]
    fn test_only_accepted_opens_gate() {
        let open: Vec<_> = ValidationOutcome::ALL
            .into_iter()
            .filter(|o| o.is_accepted())
            .collect();
        assert_eq!(open, vec![ValidationOutcome::Accepted]);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&ValidationOutcome::CombinedFailure).unwrap();
        assert_eq!(json, "\"combined_failure\"");
    }
}
