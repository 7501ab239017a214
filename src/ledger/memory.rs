//! In-memory ledger for tests and local development.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{AccountId, FeeLedger, LedgerError};

/// In-memory ledger.
///
/// Uses a BTreeMap for deterministic iteration order. `transfer` runs under
/// a single lock, so no observer sees a debit without its matching credit.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<BTreeMap<AccountId, u64>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account` out of thin air (airdrop).
    pub fn fund(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError> {
        self.credit(account, amount)
    }

    /// Snapshot of all balances.
    pub fn balances(&self) -> Result<BTreeMap<AccountId, u64>, LedgerError> {
        Ok(self.lock()?.clone())
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Result<u128, LedgerError> {
        Ok(self.lock()?.values().map(|b| *b as u128).sum())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<AccountId, u64>>, LedgerError> {
        self.balances
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".into()))
    }
}

fn debit_locked(
    balances: &mut BTreeMap<AccountId, u64>,
    account: &AccountId,
    amount: u64,
) -> Result<(), LedgerError> {
    let balance = balances
        .get_mut(account)
        .ok_or(LedgerError::AccountNotFound(*account))?;
    if *balance < amount {
        return Err(LedgerError::InsufficientFunds {
            account: *account,
            balance: *balance,
            required: amount,
        });
    }
    *balance -= amount;
    Ok(())
}

fn credit_locked(
    balances: &mut BTreeMap<AccountId, u64>,
    account: &AccountId,
    amount: u64,
) -> Result<(), LedgerError> {
    let balance = balances.entry(*account).or_insert(0);
    *balance = balance
        .checked_add(amount)
        .ok_or(LedgerError::Overflow(*account))?;
    Ok(())
}

impl FeeLedger for InMemoryLedger {
    fn balance(&self, account: &AccountId) -> Result<u64, LedgerError> {
        self.lock()?
            .get(account)
            .copied()
            .ok_or(LedgerError::AccountNotFound(*account))
    }

    fn debit(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError> {
        let mut balances = self.lock()?;
        debit_locked(&mut balances, account, amount)
    }

    fn credit(&self, account: &AccountId, amount: u64) -> Result<(), LedgerError> {
        let mut balances = self.lock()?;
        credit_locked(&mut balances, account, amount)
    }

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), LedgerError> {
        let mut balances = self.lock()?;

        // Check the credit side first so a failed transfer leaves nothing to undo.
        let to_balance = balances.get(to).copied().unwrap_or(0);
        let from_is_to = from == to;
        if !from_is_to && to_balance.checked_add(amount).is_none() {
            return Err(LedgerError::Overflow(*to));
        }

        debit_locked(&mut balances, from, amount)?;
        credit_locked(&mut balances, to, amount)
    }
}
