use std::collections::BTreeMap;

use bt_money::Micros;
use chrono::NaiveDate;

/// A virtual trading account, scoped to a single backtest run.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub initial_capital: Micros,
    pub current_cash: Micros,
    pub created_date: NaiveDate,
    pub is_active: bool,
}

impl Account {
    pub fn new(id: u64, name: impl Into<String>, initial_capital: Micros, created_date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            initial_capital,
            current_cash: initial_capital,
            created_date,
            is_active: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountError {
    UnknownAccount(u64),
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountError::UnknownAccount(id) => write!(f, "unknown account: {id}"),
        }
    }
}

impl std::error::Error for AccountError {}

/// In-simulation cash, reservation, and equity accounting.
///
/// Every mutation is serialized by construction: a backtest run is
/// single-threaded (spec §5), so there is no internal locking here.
#[derive(Default)]
pub struct AccountStore {
    accounts: BTreeMap<u64, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub fn get(&self, id: u64) -> Result<&Account, AccountError> {
        self.accounts.get(&id).ok_or(AccountError::UnknownAccount(id))
    }

    /// Atomically debit `amount` from `id`'s cash if sufficient funds exist.
    /// Returns `Ok(true)` on success, `Ok(false)` (no-op) if insufficient.
    pub fn reserve_funds(&mut self, id: u64, amount: Micros) -> Result<bool, AccountError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(AccountError::UnknownAccount(id))?;
        if account.current_cash < amount {
            return Ok(false);
        }
        account.current_cash -= amount;
        debug_assert!(account.current_cash.is_non_negative());
        Ok(true)
    }

    /// Credit `amount` back to `id`'s cash.
    pub fn release_funds(&mut self, id: u64, amount: Micros) -> Result<(), AccountError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(AccountError::UnknownAccount(id))?;
        account.current_cash += amount;
        Ok(())
    }

    /// Credit or debit `id`'s cash by a signed delta, net of commission.
    pub fn apply_trade(&mut self, id: u64, delta: Micros) -> Result<(), AccountError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(AccountError::UnknownAccount(id))?;
        account.current_cash += delta;
        debug_assert!(
            account.current_cash.is_non_negative(),
            "cash went negative; caller must pre-validate via the risk evaluator"
        );
        Ok(())
    }

    /// `currentCash + Σ openPosition.quantity · pricer(openPosition.symbol)`.
    pub fn total_equity<F>(
        &self,
        id: u64,
        open_positions: &[crate::position::Position],
        pricer: F,
    ) -> Result<Micros, AccountError>
    where
        F: Fn(&str) -> Option<Micros>,
    {
        let account = self.get(id)?;
        let mut equity = account.current_cash;
        for pos in open_positions {
            if pos.account_id != id {
                continue;
            }
            if let Some(price) = pricer(&pos.symbol) {
                equity += price * pos.quantity;
            }
        }
        Ok(equity)
    }
}
