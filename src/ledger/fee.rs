//! Validation Fee Gate
//!
//! Collects a fixed fee from the payer into the treasury once a path has been accepted.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use super::{AccountId, FeeLedger, LedgerError};

/// Base units per whole coin.
pub const UNITS_PER_COIN: u64 = 1_000_000_000;

/// Default fee: 0.01 coin.
pub const DEFAULT_VALIDATION_FEE: u64 = UNITS_PER_COIN / 100;

/// Fixed fee and its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeGate {
    /// Collection account.
    pub treasury: AccountId,
    /// Fee per accepted path, in base units.
    pub fee: u64,
}

/// Record of a collected fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeReceipt {
    /// Who paid.
    pub payer: AccountId,
    /// Who received.
    pub treasury: AccountId,
    /// Amount moved.
    pub amount: u64,
    /// When the transfer completed.
    pub collected_at: DateTime<Utc>,
}

impl FeeGate {
    /// Create a gate.
    pub const fn new(treasury: AccountId, fee: u64) -> Self {
        Self { treasury, fee }
    }

    /// Move the fee from `payer` to the treasury.
    ///
    /// A zero fee succeeds without touching the ledger.
    pub fn collect<L>(&self, ledger: &L, payer: &AccountId) -> Result<FeeReceipt, LedgerError>
    where
        L: FeeLedger + ?Sized,
    {
        if self.fee > 0 {
            ledger.transfer(payer, &self.treasury, self.fee).map_err(|e| {
                warn!("Fee collection from {} failed: {}", payer.short(), e);
                e
            })?;
        }

        debug!("Collected fee {} from {} into {}", self.fee, payer.short(), self.treasury.short());

        Ok(FeeReceipt {
            payer: *payer,
            treasury: self.treasury,
            amount: self.fee,
            collected_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;

    const TREASURY: AccountId = AccountId::new([0xEE; 32]);

    #[test]
    fn test_default_fee() {
        assert_eq!(DEFAULT_VALIDATION_FEE, 10_000_000);
    }

    #[test]
    fn test_collect_moves_fee() {
        let ledger = InMemoryLedger::new();
        let payer = AccountId::new([1; 32]);
        ledger.fund(&payer, 10 * UNITS_PER_COIN).unwrap();

        let gate = FeeGate::new(TREASURY, DEFAULT_VALIDATION_FEE);
        let receipt = gate.collect(&ledger, &payer).unwrap();

        assert_eq!(receipt.amount, DEFAULT_VALIDATION_FEE);
        assert_eq!(receipt.treasury, TREASURY);
        assert_eq!(ledger.balance(&TREASURY).unwrap(), DEFAULT_VALIDATION_FEE);
        assert_eq!(
            ledger.balance(&payer).unwrap(),
            10 * UNITS_PER_COIN - DEFAULT_VALIDATION_FEE
        );
    }

    #[test]
    fn test_collect_insufficient_funds() {
        let ledger = InMemoryLedger::new();
        let payer = AccountId::new([1; 32]);
        ledger.fund(&payer, DEFAULT_VALIDATION_FEE - 1).unwrap();

        let gate = FeeGate::new(TREASURY, DEFAULT_VALIDATION_FEE);
        assert!(matches!(
            gate.collect(&ledger, &payer),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.balance(&payer).unwrap(), DEFAULT_VALIDATION_FEE - 1);
    }

    #[test]
    fn test_zero_fee_skips_ledger() {
        let ledger = InMemoryLedger::new();
        let payer = AccountId::new([1; 32]);

        let gate = FeeGate::new(TREASURY, 0);
        let receipt = gate.collect(&ledger, &payer).unwrap();
        assert_eq!(receipt.amount, 0);
        assert!(ledger.balances().unwrap().is_empty());
    }
}
