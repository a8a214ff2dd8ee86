//! bt-risk
//!
//! The two pure-function responsibilities spec.md assigns to the Risk
//! Evaluator: order validation and stop-loss evaluation. Grounded on
//! `mqk-risk::engine::evaluate`'s shape — a side-effect-free function over
//! `(config, input) -> decision` with a small reason-code enum — but scoped
//! to exactly these two jobs. The teacher's PDT enforcement, kill switches,
//! reject-storm detection, and drawdown halts are live-trading risk
//! management concerns that don't exist in a single-account historical
//! backtest and are not reproduced here.

use bt_marketdata::Bar;
use bt_money::Micros;
use bt_portfolio::{Account, Position};
use chrono::NaiveDate;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// The subset of an order's fields the risk evaluator needs to judge it.
/// Execution's `Order` carries more (stop-loss, close reason); this is the
/// narrow view risk actually looks at.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub account_id: u64,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    UnknownSymbol,
    NonPositiveQuantity,
    AccountInactive,
    InsufficientFunds,
    DuplicateOpenPosition,
    NoPositionToClose,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::UnknownSymbol => "unknown symbol",
            RejectReason::NonPositiveQuantity => "non-positive quantity",
            RejectReason::AccountInactive => "account inactive",
            RejectReason::InsufficientFunds => "insufficient funds",
            RejectReason::DuplicateOpenPosition => "duplicate open position",
            RejectReason::NoPositionToClose => "no position to close",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Rejected(RejectReason),
}

/// Judges whether `order` may proceed, given the account's current state and
/// a price lookup for the order's symbol.
///
/// `pricer` returns `None` when the symbol has no known price yet (treated
/// as `UnknownSymbol`); execution is responsible for supplying the same
/// close price it will actually fill at, so this check and the fill agree.
pub fn validate_order<F>(
    order: &OrderRequest,
    account: &Account,
    has_open_position: bool,
    commission: Micros,
    pricer: F,
) -> Validation
where
    F: FnOnce() -> Option<Micros>,
{
    if order.quantity <= 0 {
        return Validation::Rejected(RejectReason::NonPositiveQuantity);
    }
    if !account.is_active {
        return Validation::Rejected(RejectReason::AccountInactive);
    }

    let Some(price) = pricer() else {
        return Validation::Rejected(RejectReason::UnknownSymbol);
    };

    match order.side {
        Side::Buy => {
            if has_open_position {
                return Validation::Rejected(RejectReason::DuplicateOpenPosition);
            }
            let cost = match price.checked_mul_qty(order.quantity) {
                Some(c) => c + commission,
                None => return Validation::Rejected(RejectReason::InsufficientFunds),
            };
            if account.current_cash < cost {
                return Validation::Rejected(RejectReason::InsufficientFunds);
            }
            Validation::Valid
        }
        Side::Sell => {
            if !has_open_position {
                return Validation::Rejected(RejectReason::NoPositionToClose);
            }
            Validation::Valid
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopTrigger {
    PriceStop,
    TimeStop,
}

impl std::fmt::Display for StopTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopTrigger::PriceStop => "price_stop",
            StopTrigger::TimeStop => "time_stop",
        };
        f.write_str(s)
    }
}

/// Evaluates `position`'s stop-loss conditions against today's close.
///
/// Always uses `current_bar.close`, never intraday high/low — the engine
/// operates on daily bars only. If both a price stop and a time stop would
/// fire on the same day, `PriceStop` wins the tie.
pub fn evaluate_stop_loss(position: &Position, current_bar: &Bar, current_date: NaiveDate) -> Option<StopTrigger> {
    let price_stop = position
        .stop_loss_price
        .is_some_and(|stop| current_bar.close <= stop);
    if price_stop {
        return Some(StopTrigger::PriceStop);
    }

    let time_stop = position.stop_loss_days.is_some_and(|days| {
        let held = (current_date - position.entry_date).num_days();
        held >= days
    });
    if time_stop {
        return Some(StopTrigger::TimeStop);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_marketdata::Bar;
    use bt_portfolio::PositionStatus;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn account(cash: i64, active: bool) -> Account {
        let mut a = Account::new(1, "test", Micros::from_units(cash), d(1));
        a.is_active = active;
        a
    }

    fn order(side: Side, qty: i64) -> OrderRequest {
        OrderRequest {
            account_id: 1,
            symbol: "AAA".into(),
            side,
            quantity: qty,
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let v = validate_order(&order(Side::Buy, 0), &account(10_000, true), false, Micros::from_units(5), || {
            Some(Micros::from_units(10))
        });
        assert_eq!(v, Validation::Rejected(RejectReason::NonPositiveQuantity));
    }

    #[test]
    fn inactive_account_is_rejected() {
        let v = validate_order(&order(Side::Buy, 10), &account(10_000, false), false, Micros::from_units(5), || {
            Some(Micros::from_units(10))
        });
        assert_eq!(v, Validation::Rejected(RejectReason::AccountInactive));
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let v = validate_order(&order(Side::Buy, 10), &account(10_000, true), false, Micros::from_units(5), || None);
        assert_eq!(v, Validation::Rejected(RejectReason::UnknownSymbol));
    }

    #[test]
    fn buy_with_existing_open_position_is_rejected() {
        let v = validate_order(&order(Side::Buy, 10), &account(10_000, true), true, Micros::from_units(5), || {
            Some(Micros::from_units(10))
        });
        assert_eq!(v, Validation::Rejected(RejectReason::DuplicateOpenPosition));
    }

    #[test]
    fn buy_exceeding_cash_is_insufficient_funds() {
        let v = validate_order(&order(Side::Buy, 10), &account(100, true), false, Micros::from_units(5), || {
            Some(Micros::from_units(200))
        });
        assert_eq!(v, Validation::Rejected(RejectReason::InsufficientFunds));
    }

    #[test]
    fn buy_within_cash_is_valid() {
        let v = validate_order(&order(Side::Buy, 10), &account(10_000, true), false, Micros::from_units(5), || {
            Some(Micros::from_units(200))
        });
        assert_eq!(v, Validation::Valid);
    }

    #[test]
    fn sell_with_no_open_position_is_rejected() {
        let v = validate_order(&order(Side::Sell, 10), &account(10_000, true), false, Micros::from_units(5), || {
            Some(Micros::from_units(10))
        });
        assert_eq!(v, Validation::Rejected(RejectReason::NoPositionToClose));
    }

    #[test]
    fn sell_with_open_position_is_valid() {
        let v = validate_order(&order(Side::Sell, 10), &account(10_000, true), true, Micros::from_units(5), || {
            Some(Micros::from_units(10))
        });
        assert_eq!(v, Validation::Valid);
    }

    fn position(entry_price: i64, stop_loss_price: Option<i64>, stop_loss_days: Option<i64>) -> Position {
        Position {
            id: 1,
            account_id: 1,
            symbol: "DDD".into(),
            entry_date: d(2),
            entry_price: Micros::from_units(entry_price),
            quantity: 10,
            stop_loss_price: stop_loss_price.map(Micros::from_units),
            stop_loss_days,
            status: PositionStatus::Open,
            exit_date: None,
            exit_price: None,
            realized_pl: None,
            exit_reason: None,
        }
    }

    fn bar(close: i64) -> Bar {
        Bar::new(
            "DDD",
            d(3),
            Micros::from_units(close),
            Micros::from_units(close),
            Micros::from_units(close),
            Micros::from_units(close),
            Micros::from_units(close),
            100,
        )
        .unwrap()
    }

    // Scenario S4 — price stop triggers.
    #[test]
    fn s4_price_stop_triggers() {
        let pos = position(100, Some(95), None);
        let trigger = evaluate_stop_loss(&pos, &bar(94), d(3));
        assert_eq!(trigger, Some(StopTrigger::PriceStop));
    }

    #[test]
    fn price_above_stop_does_not_trigger() {
        let pos = position(100, Some(95), None);
        let trigger = evaluate_stop_loss(&pos, &bar(96), d(3));
        assert_eq!(trigger, None);
    }

    #[test]
    fn time_stop_triggers_after_required_days_held() {
        let pos = position(100, None, Some(5));
        let trigger = evaluate_stop_loss(&pos, &bar(100), d(7));
        assert_eq!(trigger, Some(StopTrigger::TimeStop));
    }

    #[test]
    fn time_stop_does_not_trigger_before_required_days() {
        let pos = position(100, None, Some(5));
        let trigger = evaluate_stop_loss(&pos, &bar(100), d(4));
        assert_eq!(trigger, None);
    }

    #[test]
    fn price_stop_wins_the_tie_over_time_stop() {
        let pos = position(100, Some(95), Some(1));
        let trigger = evaluate_stop_loss(&pos, &bar(90), d(7));
        assert_eq!(trigger, Some(StopTrigger::PriceStop));
    }

    #[test]
    fn neither_stop_configured_never_triggers() {
        let pos = position(100, None, None);
        let trigger = evaluate_stop_loss(&pos, &bar(1), NaiveDate::from_yo_opt(2024, 100).unwrap());
        assert_eq!(trigger, None);
    }
}
