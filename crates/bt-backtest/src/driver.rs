use bt_execution::{execute, CommissionModel, Order};
use bt_marketdata::{PriceRepository, TemporalProvider};
use bt_portfolio::{Account, AccountStore, PositionStore};
use bt_risk::{evaluate_stop_loss, Side as RiskSide};
use bt_strategy::{Side as StrategySide, Strategy};
use chrono::Duration;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::metrics::compute_metrics;
use crate::types::{BacktestConfig, BacktestResult, DailySnapshot, RunStatus, Trade};

fn strategy_side_to_risk_side(side: StrategySide) -> RiskSide {
    match side {
        StrategySide::Buy => RiskSide::Buy,
        StrategySide::Sell => RiskSide::Sell,
    }
}

/// Owns nothing across runs: a fresh [`BacktestDriver::run`] call builds its
/// own Account/Position/Trade/Snapshot state, per spec §5's isolation
/// requirement (many runs may execute in parallel, sharing only the
/// read-only repository).
pub struct BacktestDriver {
    config: BacktestConfig,
}

impl BacktestDriver {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Runs the configured backtest to completion, to cancellation, or to
    /// the first engine fault — whichever comes first. Always returns a
    /// result; engine faults are reported in the result, never propagated
    /// as a `Result::Err` (spec §7: "the engine itself returns a single
    /// result value in all terminating cases").
    pub fn run(
        &self,
        repository: Box<dyn PriceRepository>,
        strategy: &mut dyn Strategy,
        commission_model: &dyn CommissionModel,
        cancellation: Option<&CancellationToken>,
    ) -> BacktestResult {
        info!(
            account_id = self.config.account_id,
            start = %self.config.start_date,
            end = %self.config.end_date,
            "starting backtest run"
        );

        let mut accounts = AccountStore::new();
        accounts.insert(Account::new(
            self.config.account_id,
            self.config.account_name.clone(),
            self.config.initial_capital,
            self.config.start_date,
        ));
        let mut positions = PositionStore::new();
        let mut trades: Vec<Trade> = Vec::new();
        let mut snapshots: Vec<DailySnapshot> = Vec::new();

        let mut provider = TemporalProvider::new(repository, self.config.start_date);
        let mut status = RunStatus::Completed;
        let mut fault: Option<crate::types::EngineFault> = None;

        let mut d = self.config.start_date;
        'day_loop: while d <= self.config.end_date {
            if let Err(err) = provider.advance_time(d) {
                status = RunStatus::Aborted;
                fault = Some(err.into());
                break;
            }

            if cancellation.is_some_and(CancellationToken::is_canceled) {
                status = RunStatus::Canceled;
                break;
            }

            // Stop-loss evaluation before strategy signals, positions in
            // ascending id order (spec §5's ordering guarantee).
            let open_ids: Vec<u64> = positions.get_open(self.config.account_id).iter().map(|p| p.id).collect();
            for position_id in open_ids {
                let position = positions.get(position_id).expect("id just listed by get_open").clone();
                let bar = match provider.get_bar(&position.symbol, d) {
                    Ok(bar) => bar,
                    Err(err) => {
                        status = RunStatus::Aborted;
                        fault = Some(err.into());
                        break 'day_loop;
                    }
                };
                if let Some(trigger) = evaluate_stop_loss(&position, &bar, d) {
                    let order = Order::sell(self.config.account_id, position.symbol.clone(), position.quantity)
                        .with_close_reason(trigger.to_string());
                    match execute(&order, &mut provider, &mut accounts, &mut positions, commission_model, d) {
                        Ok(result) if result.success => {
                            debug!(symbol = %position.symbol, trigger = %trigger, "stop-loss triggered");
                            trades.push(Trade {
                                date: d,
                                symbol: position.symbol.clone(),
                                side: StrategySide::Sell,
                                quantity: position.quantity,
                                price: result.execution_price.unwrap(),
                                commission: result.commission.unwrap(),
                                position_id: result.position_id.unwrap(),
                                exit_reason: Some(trigger.to_string()),
                            });
                        }
                        Ok(result) => {
                            warn!(symbol = %position.symbol, reason = ?result.reason, "stop-loss order rejected");
                        }
                        Err(err) => {
                            status = RunStatus::Aborted;
                            fault = Some(err.into());
                            break 'day_loop;
                        }
                    }
                }
            }

            let signals = strategy.generate_signals(&mut provider, d);
            for signal in signals {
                let side = strategy_side_to_risk_side(signal.side);
                let order = Order {
                    account_id: self.config.account_id,
                    symbol: signal.symbol.clone(),
                    side,
                    quantity: signal.quantity,
                    stop_loss_price: signal.stop_loss_price,
                    stop_loss_days: signal.stop_loss_days,
                    close_reason: signal.reason.clone(),
                };
                match execute(&order, &mut provider, &mut accounts, &mut positions, commission_model, d) {
                    Ok(result) if result.success => {
                        trades.push(Trade {
                            date: d,
                            symbol: signal.symbol,
                            side: signal.side,
                            quantity: signal.quantity,
                            price: result.execution_price.unwrap(),
                            commission: result.commission.unwrap(),
                            position_id: result.position_id.unwrap(),
                            exit_reason: signal.reason,
                        });
                    }
                    Ok(result) => {
                        debug!(symbol = %signal.symbol, reason = ?result.reason, "signal order rejected");
                    }
                    Err(err) => {
                        status = RunStatus::Aborted;
                        fault = Some(err.into());
                        break 'day_loop;
                    }
                }
            }

            let open = positions.get_open(self.config.account_id);
            let mut positions_value = bt_money::Micros::ZERO;
            let mut pricing_failed = false;
            for position in &open {
                match provider.get_bar(&position.symbol, d) {
                    Ok(bar) => positions_value += bar.close * position.quantity,
                    Err(err) => {
                        status = RunStatus::Aborted;
                        fault = Some(err.into());
                        pricing_failed = true;
                        break;
                    }
                }
            }
            if pricing_failed {
                break;
            }
            let open_count = open.len();
            let cash = accounts.get(self.config.account_id).expect("account inserted at run start").current_cash;
            snapshots.push(DailySnapshot {
                date: d,
                cash,
                positions_value,
                total_equity: cash + positions_value,
                open_positions: open_count,
            });

            d += Duration::days(1);
        }

        let metrics = compute_metrics(self.config.initial_capital, &trades, &snapshots);
        info!(status = ?status, trades = trades.len(), snapshots = snapshots.len(), "backtest run finished");

        BacktestResult {
            config: self.config.clone(),
            status,
            fault,
            metrics,
            trades,
            daily_snapshots: snapshots,
        }
    }
}
