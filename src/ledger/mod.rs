//! Ledger Capability
//!
//! The validator never owns balances. It asks a [`FeeLedger`] to move the
//! validation fee and observes success or failure.

pub mod fee;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::hash_with_domain;

/// 32-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an account id from an external subject (e.g. a JWT `sub`).
    pub fn derive(subject: &str) -> Self {
        Self(hash_with_domain(b"path-validator-account:", subject.as_bytes()))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short())
    }
}

/// Account id parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    /// Not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// Wrong number of bytes.
    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| AccountIdError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AccountIdError::WrongLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

/// Ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Account has never been funded.
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    /// Debit larger than the balance.
    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Account being debited.
        account: AccountId,
        /// Balance at the time of the debit.
        balance: u64,
        /// Amount requested.
        required: u64,
    },
    /// Credit would overflow the balance.
    #[error("balance overflow in {0}")]
    Overflow(AccountId),
    /// Backend could not be reached or is in a bad state.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Balance operations the fee gate needs.
///
/// Implementations own their synchronization; every method takes `&self`.
pub trait FeeLedger: Send + Sync {
    /// Current balance, or `AccountNotFound`.
    fn balance(&self, account: &AccountId) -> Result<u64, LedgerError>;

    /// Remove `amount` from `account`.
    fn debit(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError>;

    /// Add `amount` to `account`, creating it if needed.
    fn credit(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`.
    ///
    /// The default debits, then credits, and refunds the debit if the credit fails.
    /// Backends that can do better should make this a single atomic step.
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        if let Err(e) = self.credit(to, amount) {
            if let Err(refund) = self.credit(from, amount) {
                tracing::error!(
                    "Refund of {} to {} failed after credit error: {}",
                    amount, from.short(), refund
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

pub use fee::{FeeGate, FeeReceipt, DEFAULT_VALIDATION_FEE};
pub use memory::InMemoryLedger;
