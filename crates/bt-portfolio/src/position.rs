use std::collections::BTreeMap;

use bt_money::Micros;
use chrono::NaiveDate;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// An open or closed position belonging to one account in one symbol.
///
/// Once `status` is `Closed` the exit fields are immutable for the
/// lifetime of the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub id: u64,
    pub account_id: u64,
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: Micros,
    pub quantity: i64,
    pub stop_loss_price: Option<Micros>,
    pub stop_loss_days: Option<i64>,
    pub status: PositionStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<Micros>,
    pub realized_pl: Option<Micros>,
    pub exit_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionError {
    /// A Buy was attempted against (accountId, symbol) with an Open position already.
    AlreadyOpen { account_id: u64, symbol: String },
    /// `close` was called against an id with no matching position, or one
    /// already Closed.
    NoSuchOpenPosition(u64),
}

impl std::fmt::Display for PositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionError::AlreadyOpen { account_id, symbol } => {
                write!(f, "position already open for account {account_id} symbol {symbol}")
            }
            PositionError::NoSuchOpenPosition(id) => write!(f, "no open position with id {id}"),
        }
    }
}

impl std::error::Error for PositionError {}

/// Open/closed positions and P&L bookkeeping, keyed by a monotonically
/// increasing integer id (spec §9: arena-style store, no in-object
/// references).
#[derive(Default)]
pub struct PositionStore {
    positions: BTreeMap<u64, Position>,
    next_id: u64,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Open position. Fails with `AlreadyOpen` if (accountId,
    /// symbol) already has an Open position.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        account_id: u64,
        symbol: impl Into<String>,
        price: Micros,
        quantity: i64,
        date: NaiveDate,
        stop_loss_price: Option<Micros>,
        stop_loss_days: Option<i64>,
    ) -> Result<&Position, PositionError> {
        let symbol = symbol.into();
        if self.find_open(account_id, &symbol).is_some() {
            return Err(PositionError::AlreadyOpen { account_id, symbol });
        }
        self.next_id += 1;
        let id = self.next_id;
        let position = Position {
            id,
            account_id,
            symbol,
            entry_date: date,
            entry_price: price,
            quantity,
            stop_loss_price,
            stop_loss_days,
            status: PositionStatus::Open,
            exit_date: None,
            exit_price: None,
            realized_pl: None,
            exit_reason: None,
        };
        self.positions.insert(id, position);
        Ok(self.positions.get(&id).unwrap())
    }

    /// Transitions a position to Closed. `realizedPL = (exitPrice -
    /// entryPrice) * quantity`, computed exactly once.
    pub fn close(
        &mut self,
        position_id: u64,
        exit_price: Micros,
        date: NaiveDate,
        reason: impl Into<String>,
    ) -> Result<&Position, PositionError> {
        let position = self
            .positions
            .get_mut(&position_id)
            .filter(|p| p.status == PositionStatus::Open)
            .ok_or(PositionError::NoSuchOpenPosition(position_id))?;

        let diff = exit_price - position.entry_price;
        let realized_pl = diff
            .checked_mul_qty(position.quantity)
            .unwrap_or(if diff.is_negative() { Micros::MIN } else { Micros::MAX });

        position.status = PositionStatus::Closed;
        position.exit_date = Some(date);
        position.exit_price = Some(exit_price);
        position.realized_pl = Some(realized_pl);
        position.exit_reason = Some(reason.into());

        Ok(position)
    }

    pub fn get(&self, id: u64) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// All Open positions for `account_id`, ordered by ascending id — this
    /// ordering is part of the contract (spec §5: stop-loss evaluation
    /// order is by position id ascending).
    pub fn get_open(&self, account_id: u64) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| p.account_id == account_id && p.status == PositionStatus::Open)
            .collect()
    }

    pub fn find_open(&self, account_id: u64, symbol: &str) -> Option<&Position> {
        self.positions
            .values()
            .find(|p| p.account_id == account_id && p.symbol == symbol && p.status == PositionStatus::Open)
    }

    /// All positions (Open and Closed) ever created in this store, ascending
    /// by id. Used by the metrics calculator to pair round-trips.
    pub fn all(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn open_then_close_computes_realized_pl() {
        let mut store = PositionStore::new();
        store
            .open(1, "AAA", Micros::from_units(100), 10, d(2), None, None)
            .unwrap();
        let pos = store.find_open(1, "AAA").unwrap();
        let id = pos.id;

        let closed = store.close(id, Micros::from_units(110), d(5), "user").unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert_eq!(closed.realized_pl, Some(Micros::from_units(100)));
    }

    #[test]
    fn duplicate_open_is_rejected() {
        let mut store = PositionStore::new();
        store
            .open(1, "AAA", Micros::from_units(100), 10, d(2), None, None)
            .unwrap();
        let err = store.open(1, "AAA", Micros::from_units(105), 5, d(3), None, None);
        assert!(matches!(err, Err(PositionError::AlreadyOpen { .. })));
    }

    #[test]
    fn closing_unknown_position_is_an_error() {
        let mut store = PositionStore::new();
        let err = store.close(42, Micros::from_units(1), d(2), "x");
        assert!(matches!(err, Err(PositionError::NoSuchOpenPosition(42))));
    }

    #[test]
    fn closed_position_cannot_be_closed_again() {
        let mut store = PositionStore::new();
        store
            .open(1, "AAA", Micros::from_units(100), 10, d(2), None, None)
            .unwrap();
        let id = store.find_open(1, "AAA").unwrap().id;
        store.close(id, Micros::from_units(110), d(5), "user").unwrap();

        let err = store.close(id, Micros::from_units(120), d(6), "user");
        assert!(matches!(err, Err(PositionError::NoSuchOpenPosition(_))));
    }

    #[test]
    fn get_open_is_ordered_by_ascending_id() {
        let mut store = PositionStore::new();
        store
            .open(1, "AAA", Micros::from_units(100), 10, d(2), None, None)
            .unwrap();
        store
            .open(1, "BBB", Micros::from_units(50), 5, d(2), None, None)
            .unwrap();
        let open = store.get_open(1);
        assert_eq!(open.len(), 2);
        assert!(open[0].id < open[1].id);
    }

    #[test]
    fn different_accounts_may_each_hold_the_same_symbol() {
        let mut store = PositionStore::new();
        store
            .open(1, "AAA", Micros::from_units(100), 10, d(2), None, None)
            .unwrap();
        let ok = store.open(2, "AAA", Micros::from_units(100), 10, d(2), None, None);
        assert!(ok.is_ok());
    }
}
