use bt_marketdata::{ProviderFault, TemporalProvider};
use bt_money::Micros;
use bt_portfolio::{AccountStore, PositionStore};
use bt_risk::{validate_order, OrderRequest, RejectReason, Side, Validation};
use chrono::NaiveDate;

use crate::commission::CommissionModel;

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub account_id: u64,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub stop_loss_price: Option<Micros>,
    pub stop_loss_days: Option<i64>,
    /// Only meaningful for Sell orders synthesized by stop-loss evaluation.
    pub close_reason: Option<String>,
}

impl Order {
    pub fn buy(account_id: u64, symbol: impl Into<String>, quantity: i64) -> Self {
        Self {
            account_id,
            symbol: symbol.into(),
            side: Side::Buy,
            quantity,
            stop_loss_price: None,
            stop_loss_days: None,
            close_reason: None,
        }
    }

    pub fn sell(account_id: u64, symbol: impl Into<String>, quantity: i64) -> Self {
        Self {
            account_id,
            symbol: symbol.into(),
            side: Side::Sell,
            quantity,
            stop_loss_price: None,
            stop_loss_days: None,
            close_reason: None,
        }
    }

    pub fn with_stop_loss(mut self, price: Option<Micros>, days: Option<i64>) -> Self {
        self.stop_loss_price = price;
        self.stop_loss_days = days;
        self
    }

    pub fn with_close_reason(mut self, reason: impl Into<String>) -> Self {
        self.close_reason = Some(reason.into());
        self
    }

    fn as_request(&self) -> OrderRequest {
        OrderRequest {
            account_id: self.account_id,
            symbol: self.symbol.clone(),
            side: self.side,
            quantity: self.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderResult {
    pub success: bool,
    pub reason: Option<RejectReason>,
    pub execution_price: Option<Micros>,
    pub commission: Option<Micros>,
    pub position_id: Option<u64>,
}

impl OrderResult {
    fn rejected(reason: RejectReason) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            execution_price: None,
            commission: None,
            position_id: None,
        }
    }

    fn filled(execution_price: Micros, commission: Micros, position_id: Option<u64>) -> Self {
        Self {
            success: true,
            reason: None,
            execution_price: Some(execution_price),
            commission: Some(commission),
            position_id,
        }
    }
}

/// Runs `order` against today's close, validating it through C5 before
/// touching any store. A provider fault here is always an engine fault —
/// unlike a `RejectReason`, it propagates and aborts the run (spec §7).
pub fn execute(
    order: &Order,
    provider: &mut TemporalProvider,
    accounts: &mut AccountStore,
    positions: &mut PositionStore,
    commission_model: &dyn CommissionModel,
    current_date: NaiveDate,
) -> Result<OrderResult, ProviderFault> {
    let account = accounts.get(order.account_id).expect("order references an unknown account").clone();

    let bar = provider.get_bar(&order.symbol, current_date)?;
    let execution_price = bar.close;
    let commission = commission_model.commission(order.quantity, execution_price);

    let request = order.as_request();
    let has_open = positions.find_open(order.account_id, &order.symbol).is_some();
    let validation = validate_order(&request, &account, has_open, commission, || Some(execution_price));

    let Validation::Valid = validation else {
        let Validation::Rejected(reason) = validation else {
            unreachable!()
        };
        return Ok(OrderResult::rejected(reason));
    };

    match order.side {
        Side::Buy => {
            let notional = execution_price.checked_mul_qty(order.quantity).unwrap_or(Micros::MAX);
            let cost = notional + commission;
            let reserved = accounts
                .reserve_funds(order.account_id, cost)
                .expect("account existence already confirmed above");
            if !reserved {
                return Ok(OrderResult::rejected(RejectReason::InsufficientFunds));
            }
            let position = positions
                .open(
                    order.account_id,
                    order.symbol.clone(),
                    execution_price,
                    order.quantity,
                    current_date,
                    order.stop_loss_price,
                    order.stop_loss_days,
                )
                .expect("duplicate-open already ruled out by validate_order");
            Ok(OrderResult::filled(execution_price, commission, Some(position.id)))
        }
        Side::Sell => {
            let open = positions
                .find_open(order.account_id, &order.symbol)
                .expect("NoPositionToClose already ruled out by validate_order");
            let position_id = open.id;
            let reason = order.close_reason.clone().unwrap_or_else(|| "user".to_string());
            positions
                .close(position_id, execution_price, current_date, reason)
                .expect("position id obtained from find_open above");

            let notional = execution_price.checked_mul_qty(order.quantity).unwrap_or(Micros::MAX);
            let proceeds = notional - commission;
            accounts
                .apply_trade(order.account_id, proceeds)
                .expect("account existence already confirmed above");
            Ok(OrderResult::filled(execution_price, commission, Some(position_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::FlatFee;
    use bt_marketdata::{Bar, InMemoryPriceRepository};
    use bt_portfolio::Account;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(symbol: &str, date: NaiveDate, close: i64) -> Bar {
        Bar::new(
            symbol,
            date,
            Micros::from_units(close),
            Micros::from_units(close),
            Micros::from_units(close),
            Micros::from_units(close),
            Micros::from_units(close),
            100,
        )
        .unwrap()
    }

    struct Fixture {
        provider: TemporalProvider,
        accounts: AccountStore,
        positions: PositionStore,
        commission: FlatFee,
    }

    fn fixture(bars: Vec<Bar>, start: NaiveDate, cash: i64) -> Fixture {
        let mut repo = InMemoryPriceRepository::new();
        repo.extend(bars);
        let mut provider = TemporalProvider::new(Box::new(repo), start);
        provider.advance_time(start).unwrap();
        let mut accounts = AccountStore::new();
        accounts.insert(Account::new(1, "test", Micros::from_units(cash), start));
        Fixture {
            provider,
            accounts,
            positions: PositionStore::new(),
            commission: FlatFee::units(5),
        }
    }

    // Scenario S2 — simple buy/sell P&L.
    #[test]
    fn s2_simple_buy_sell_pnl() {
        let mut f = fixture(
            vec![
                bar("BBB", d(2), 100),
                bar("BBB", d(3), 110),
                bar("BBB", d(10), 120),
            ],
            d(2),
            10_000,
        );

        f.provider.advance_time(d(3)).unwrap();
        let buy = Order::buy(1, "BBB", 10);
        let result = execute(&buy, &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(3)).unwrap();
        assert!(result.success);
        assert_eq!(f.accounts.get(1).unwrap().current_cash, Micros::from_units(8_895));

        f.provider.advance_time(d(10)).unwrap();
        let sell = Order::sell(1, "BBB", 10);
        let result = execute(&sell, &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(10)).unwrap();
        assert!(result.success);
        assert_eq!(f.accounts.get(1).unwrap().current_cash, Micros::from_units(10_090));

        let closed = f.positions.get(result.position_id.unwrap()).unwrap();
        assert_eq!(closed.realized_pl, Some(Micros::from_units(100)));
    }

    // Scenario S3 — insufficient funds rejection.
    #[test]
    fn s3_insufficient_funds_is_a_noop() {
        let mut f = fixture(vec![bar("CCC", d(2), 200)], d(2), 1_000);
        let buy = Order::buy(1, "CCC", 10);
        let result = execute(&buy, &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(2)).unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, Some(RejectReason::InsufficientFunds));
        assert_eq!(f.accounts.get(1).unwrap().current_cash, Micros::from_units(1_000));
        assert!(f.positions.get_open(1).is_empty());
    }

    // Scenario S5 — duplicate open rejected.
    #[test]
    fn s5_duplicate_open_is_rejected() {
        let mut f = fixture(vec![bar("EEE", d(2), 50), bar("EEE", d(3), 55)], d(2), 10_000);
        execute(&Order::buy(1, "EEE", 10), &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(2))
            .unwrap();

        f.provider.advance_time(d(3)).unwrap();
        let result = execute(&Order::buy(1, "EEE", 5), &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(3))
            .unwrap();
        assert_eq!(result.reason, Some(RejectReason::DuplicateOpenPosition));
        assert_eq!(f.positions.get_open(1).len(), 1);
    }

    #[test]
    fn sell_with_no_open_position_is_rejected() {
        let mut f = fixture(vec![bar("FFF", d(2), 50)], d(2), 10_000);
        let result = execute(&Order::sell(1, "FFF", 10), &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(2))
            .unwrap();
        assert_eq!(result.reason, Some(RejectReason::NoPositionToClose));
    }

    #[test]
    fn future_data_access_propagates_as_engine_fault() {
        let mut f = fixture(vec![bar("GGG", d(5), 50)], d(2), 10_000);
        let err = execute(&Order::buy(1, "GGG", 1), &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(5));
        assert!(matches!(err, Err(ProviderFault::FutureDataAccess { .. })));
    }

    #[test]
    fn rejected_order_leaves_cash_and_positions_untouched() {
        let mut f = fixture(vec![bar("HHH", d(2), 200)], d(2), 100);
        let before_cash = f.accounts.get(1).unwrap().current_cash;
        execute(&Order::buy(1, "HHH", 10), &mut f.provider, &mut f.accounts, &mut f.positions, &f.commission, d(2))
            .unwrap();
        assert_eq!(f.accounts.get(1).unwrap().current_cash, before_cash);
        assert!(f.positions.get_open(1).is_empty());
    }
}
