//! Deterministic sweeps over a run's trades and snapshots (C9). Plain
//! functions over slices, no side effects — the style
//! `mqk_portfolio::metrics` uses for its exposure/equity computations.

use bt_money::Micros;
use bt_strategy::Side;

use crate::types::{DailySnapshot, Metrics, Trade};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn final_equity(snapshots: &[DailySnapshot], initial_capital: Micros) -> Micros {
    snapshots.last().map(|s| s.total_equity).unwrap_or(initial_capital)
}

fn total_return(final_equity: Micros, initial_capital: Micros) -> f64 {
    if initial_capital == Micros::ZERO {
        return 0.0;
    }
    (final_equity.to_f64() - initial_capital.to_f64()) / initial_capital.to_f64()
}

/// Sweeps snapshots left-to-right maintaining a running equity peak; reports
/// the largest fractional decline from that peak.
fn max_drawdown(snapshots: &[DailySnapshot]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for snapshot in snapshots {
        let equity = snapshot.total_equity.to_f64();
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Per-day simple returns `r_t = (eq_t - eq_{t-1}) / eq_{t-1}`, mean over
/// population stdev, annualized by `sqrt(252)`. Zero if fewer than two
/// snapshots or the return series has zero variance.
fn sharpe_ratio(snapshots: &[DailySnapshot]) -> f64 {
    if snapshots.len() < 2 {
        return 0.0;
    }
    let mut returns = Vec::with_capacity(snapshots.len() - 1);
    for pair in snapshots.windows(2) {
        let prev = pair[0].total_equity.to_f64();
        let curr = pair[1].total_equity.to_f64();
        if prev == 0.0 {
            continue;
        }
        returns.push((curr - prev) / prev);
    }
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let stdev = variance.sqrt();
    if stdev == 0.0 {
        return 0.0;
    }
    (mean / stdev) * TRADING_DAYS_PER_YEAR.sqrt()
}

struct RoundTrip {
    entry_price: Micros,
    exit_price: Micros,
}

/// Groups trades into round-trips by `(symbol, positionId)`: exactly one Buy
/// and one Sell per group. Unmatched trades (a Buy with no matching Sell
/// yet, or vice versa) are excluded — they still moved cash, but they are
/// not a closed round-trip for win-rate purposes.
fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    use std::collections::HashMap;

    let mut buys: HashMap<u64, Micros> = HashMap::new();
    let mut sells: HashMap<u64, Micros> = HashMap::new();
    for trade in trades {
        match trade.side {
            Side::Buy => {
                buys.insert(trade.position_id, trade.price);
            }
            Side::Sell => {
                sells.insert(trade.position_id, trade.price);
            }
        }
    }

    buys.into_iter()
        .filter_map(|(position_id, entry_price)| {
            sells.get(&position_id).map(|&exit_price| RoundTrip { entry_price, exit_price })
        })
        .collect()
}

fn win_rate(round_trips: &[RoundTrip]) -> f64 {
    if round_trips.is_empty() {
        return 0.0;
    }
    let wins = round_trips.iter().filter(|rt| rt.exit_price > rt.entry_price).count();
    wins as f64 / round_trips.len() as f64
}

/// Computes the C9 aggregate block from a run's trades and snapshots.
/// Commission is not subtracted separately here — it is already reflected
/// in `currentCash` via the order execution that produced each trade.
pub fn compute_metrics(initial_capital: Micros, trades: &[Trade], snapshots: &[DailySnapshot]) -> Metrics {
    let final_equity = final_equity(snapshots, initial_capital);
    let trips = round_trips(trades);
    Metrics {
        final_equity,
        total_return: total_return(final_equity, initial_capital),
        max_drawdown: max_drawdown(snapshots),
        sharpe_ratio: sharpe_ratio(snapshots),
        win_rate: win_rate(&trips),
        total_trades: trips.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn snapshot(day: u32, equity: i64) -> DailySnapshot {
        DailySnapshot {
            date: d(day),
            cash: Micros::from_units(equity),
            positions_value: Micros::ZERO,
            total_equity: Micros::from_units(equity),
            open_positions: 0,
        }
    }

    #[test]
    fn empty_snapshots_reports_initial_capital_and_zero_return() {
        let metrics = compute_metrics(Micros::from_units(10_000), &[], &[]);
        assert_eq!(metrics.final_equity, Micros::from_units(10_000));
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn total_return_reflects_final_minus_initial() {
        let snapshots = vec![snapshot(2, 10_000), snapshot(3, 11_000)];
        let metrics = compute_metrics(Micros::from_units(10_000), &[], &snapshots);
        assert!((metrics.total_return - 0.1).abs() < 1e-9);
    }

    #[test]
    fn max_drawdown_tracks_running_peak() {
        let snapshots = vec![
            snapshot(1, 1_000),
            snapshot(2, 1_200),
            snapshot(3, 900),
            snapshot(4, 1_100),
        ];
        let metrics = compute_metrics(Micros::from_units(1_000), &[], &snapshots);
        // peak 1200 -> trough 900: (1200-900)/1200 = 0.25
        assert!((metrics.max_drawdown - 0.25).abs() < 1e-9);
    }

    #[test]
    fn sharpe_is_zero_with_fewer_than_two_snapshots() {
        let metrics = compute_metrics(Micros::from_units(1_000), &[], &[snapshot(1, 1_000)]);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn sharpe_is_zero_when_returns_have_no_variance() {
        let flat = vec![snapshot(1, 1_000), snapshot(2, 1_000), snapshot(3, 1_000)];
        let metrics = compute_metrics(Micros::from_units(1_000), &[], &flat);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    fn trade(position_id: u64, side: Side, price: i64) -> Trade {
        Trade {
            date: d(1),
            symbol: "AAA".into(),
            side,
            quantity: 10,
            price: Micros::from_units(price),
            commission: Micros::from_units(5),
            position_id,
            exit_reason: None,
        }
    }

    #[test]
    fn win_rate_counts_profitable_round_trips() {
        let trades = vec![
            trade(1, Side::Buy, 100),
            trade(1, Side::Sell, 110),
            trade(2, Side::Buy, 100),
            trade(2, Side::Sell, 90),
        ];
        let metrics = compute_metrics(Micros::from_units(1_000), &trades, &[]);
        assert_eq!(metrics.total_trades, 2);
        assert_eq!(metrics.win_rate, 0.5);
    }

    #[test]
    fn unmatched_trade_is_excluded_from_trade_count() {
        let trades = vec![trade(1, Side::Buy, 100)];
        let metrics = compute_metrics(Micros::from_units(1_000), &trades, &[]);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
    }
}
