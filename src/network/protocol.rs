//! Protocol Messages
//!
//! Wire format for path submissions over WebSocket.
//! Control messages are JSON for debugging ease; a validation request
//! may also be sent as a bincode binary frame.

use serde::{Serialize, Deserialize};

use crate::core::hash::PathDigest;
use crate::validator::{ValidationError, ValidationOutcome, ValidationReceipt};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate and bind the connection to a payer account.
    Auth(AuthRequest),

    /// Submit a path with its claimed proof.
    Validate(ValidateRequest),

    /// Query the authenticated account's balance.
    Balance,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Identity provider token (JWT). Ignored when the server runs without auth.
    #[serde(default)]
    pub token: String,
    /// Account to act as (hex), honoured only when the server runs without auth.
    #[serde(default)]
    pub account: Option<String>,
    /// Client version for logging.
    #[serde(default)]
    pub client_version: String,
}

/// A path submission.
///
/// This is a flat struct so it also works as a bincode binary frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    /// Client-chosen id echoed in the response.
    pub request_id: u64,
    /// Claimed commitment to `path`.
    pub proof: PathDigest,
    /// Raw path bytes.
    pub path: Vec<u8>,
}

impl ValidateRequest {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Result of a path submission.
    ValidationResult(ValidationResponse),

    /// Balance of the authenticated account.
    Balance { account: String, balance: u64 },

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Authentication result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Payer account (hex) if successful.
    pub account: Option<String>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Server version.
    pub server_version: String,
}

/// Result of a path submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// Echo of the request id.
    pub request_id: u64,
    /// Whether the path was accepted and the fee collected.
    pub accepted: bool,
    /// Resolved outcome. None when the path was malformed or the fee failed.
    pub outcome: Option<ValidationOutcome>,
    /// Numeric error code on rejection.
    pub code: Option<u32>,
    /// Human-readable result.
    pub message: String,
    /// Computed digest (hex) on acceptance.
    pub digest: Option<String>,
    /// Fee charged, in base units. Zero unless accepted.
    pub fee_charged: u64,
    /// Submission id on acceptance.
    pub submission_id: Option<String>,
}

impl ValidationResponse {
    /// Build the response for a validator result.
    pub fn from_result(
        request_id: u64,
        result: &Result<ValidationReceipt, ValidationError>,
    ) -> Self {
        match result {
            Ok(receipt) => Self {
                request_id,
                accepted: true,
                outcome: Some(ValidationOutcome::Accepted),
                code: None,
                message: "Path accepted".to_string(),
                digest: Some(hex::encode(receipt.digest)),
                fee_charged: receipt.fee.amount,
                submission_id: Some(receipt.submission_id.to_string()),
            },
            Err(err) => Self {
                request_id,
                accepted: false,
                outcome: err.outcome(),
                code: Some(err.code()),
                message: err.to_string(),
                digest: None,
                fee_charged: 0,
                submission_id: None,
            },
        }
    }
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Create an error message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Authentication failed.
    AuthFailed,
    /// Not authenticated.
    NotAuthenticated,
    /// JWT token has expired.
    TokenExpired,
    /// Invalid JWT token (signature, format, claims).
    InvalidToken,
    /// Invalid input.
    InvalidInput,
    /// Account has never been funded.
    AccountNotFound,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use crate::ledger::{AccountId, FeeReceipt, LedgerError};

    fn receipt() -> ValidationReceipt {
        ValidationReceipt {
            submission_id: Uuid::nil(),
            digest: [0xAB; 32],
            max_speed: 1,
            sample_count: 64,
            fee: FeeReceipt {
                payer: AccountId::new([1; 32]),
                treasury: AccountId::new([2; 32]),
                amount: 10_000_000,
                collected_at: Utc::now(),
            },
            accepted_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_message_json() {
        let msg = ClientMessage::Validate(ValidateRequest {
            request_id: 7,
            proof: [3; 32],
            path: vec![0, 0, 0, 1],
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"validate\""));
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_auth_message_defaults() {
        let parsed = ClientMessage::from_json(r#"{"type":"auth","token":"abc"}"#).unwrap();
        match parsed {
            ClientMessage::Auth(auth) => {
                assert_eq!(auth.token, "abc");
                assert!(auth.account.is_none());
                assert!(auth.client_version.is_empty());
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_unit_variants_parse() {
        assert_eq!(ClientMessage::from_json(r#"{"type":"balance"}"#).unwrap(), ClientMessage::Balance);
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"ping","timestamp":5}"#).unwrap(),
            ClientMessage::Ping { timestamp: 5 }
        );
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn test_binary_validate_request() {
        // Tagged enums are not supported by bincode, so only the flat request goes binary.
        let request = ValidateRequest {
            request_id: u64::MAX,
            proof: [9; 32],
            path: (0..64u8).flat_map(|i| [0, i]).collect(),
        };

        let bytes = request.to_bytes().unwrap();
        assert_eq!(ValidateRequest::from_bytes(&bytes).unwrap(), request);
        assert!(ValidateRequest::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn test_accepted_response() {
        let response = ValidationResponse::from_result(1, &Ok(receipt()));
        assert!(response.accepted);
        assert_eq!(response.outcome, Some(ValidationOutcome::Accepted));
        assert_eq!(response.code, None);
        assert_eq!(response.digest.as_deref(), Some("ab".repeat(32).as_str()));
        assert_eq!(response.fee_charged, 10_000_000);
    }

    #[test]
    fn test_rejected_responses() {
        let cases = [
            (ValidationError::ProofMismatch, Some(ValidationOutcome::ProofMismatch), 6000),
            (
                ValidationError::SpeedViolation { max_speed: 2, limit: 1 },
                Some(ValidationOutcome::SpeedViolation),
                6001,
            ),
            (
                ValidationError::CombinedFailure { max_speed: 2, limit: 1 },
                Some(ValidationOutcome::CombinedFailure),
                6002,
            ),
            (ValidationError::EmptyPath, None, 6003),
        ];

        for (err, outcome, code) in cases {
            let response = ValidationResponse::from_result(2, &Err(err));
            assert!(!response.accepted);
            assert_eq!(response.outcome, outcome);
            assert_eq!(response.code, Some(code));
            assert_eq!(response.fee_charged, 0);
            assert!(response.digest.is_none());
        }
    }

    #[test]
    fn test_fee_failure_response() {
        let payer = AccountId::new([1; 32]);
        let err = ValidationError::FeeTransferFailed(LedgerError::InsufficientFunds {
            account: payer,
            balance: 1,
            required: 10,
        });
        let response = ValidationResponse::from_result(3, &Err(err));
        assert!(!response.accepted);
        assert_eq!(response.outcome, None);
        assert_eq!(response.code, Some(6005));
        assert!(response.message.contains("fee transfer failed"));

        let json = ServerMessage::ValidationResult(response).to_json().unwrap();
        assert!(json.contains("\"outcome\":null"));
        assert!(json.contains("\"accepted\":false"));
    }

    #[test]
    fn test_server_messages_json() {
        let msg = ServerMessage::ValidationResult(ValidationResponse::from_result(
            4,
            &Err(ValidationError::CombinedFailure { max_speed: 2, limit: 1 }),
        ));
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"validation_result\""));
        assert!(json.contains("combined_failure"));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);

        let error = ServerMessage::Error(ServerError::new(ErrorCode::AuthFailed, "Invalid token"));
        assert!(error.to_json().unwrap().contains("auth_failed"));
    }
}
