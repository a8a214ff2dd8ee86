use bt_marketdata::TemporalProvider;
use bt_money::Micros;
use chrono::{Duration, NaiveDate};

use crate::strategy::{Strategy, StrategySpec};
use crate::types::Signal;

/// Moving-average crossover: buys when the short MA crosses above the long
/// MA, sells when it crosses back below. The reference strategy spec.md
/// requires; parameters are caller-supplied, not learned.
#[derive(Clone, Debug)]
pub struct MovingAverageCrossover {
    short_period: usize,
    long_period: usize,
    position_size: i64,
    symbols: Vec<String>,
    stop_loss_price_offset: Option<Micros>,
    stop_loss_days: Option<i64>,
}

impl MovingAverageCrossover {
    /// `short_period` must be strictly less than `long_period`.
    pub fn new(short_period: usize, long_period: usize, position_size: i64, symbols: Vec<String>) -> Self {
        assert!(short_period < long_period, "short_period must be < long_period");
        Self {
            short_period,
            long_period,
            position_size,
            symbols,
            stop_loss_price_offset: None,
            stop_loss_days: None,
        }
    }

    pub fn with_stop_loss(mut self, price_offset: Option<Micros>, days: Option<i64>) -> Self {
        self.stop_loss_price_offset = price_offset;
        self.stop_loss_days = days;
        self
    }

    fn mean_last(closes: &[f64], n: usize) -> Option<f64> {
        if closes.len() < n {
            return None;
        }
        let window = &closes[closes.len() - n..];
        Some(window.iter().sum::<f64>() / n as f64)
    }

    fn signal_for_symbol(&self, provider: &mut TemporalProvider, symbol: &str, current_date: NaiveDate) -> Option<Signal> {
        let from = current_date - Duration::days(2 * self.long_period as i64);
        let bars = provider.get_historical_bars(symbol, from, current_date);
        if bars.len() < self.long_period {
            return None;
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close.to_f64()).collect();
        let short_ma = Self::mean_last(&closes, self.short_period)?;
        let long_ma = Self::mean_last(&closes, self.long_period)?;

        let prev_closes = &closes[..closes.len() - 1];
        let short_ma_prev = Self::mean_last(prev_closes, self.short_period)?;
        let long_ma_prev = Self::mean_last(prev_closes, self.long_period)?;

        if short_ma_prev <= long_ma_prev && short_ma > long_ma {
            Some(Signal::buy(symbol, self.position_size).with_stop_loss(
                self.stop_loss_price_offset
                    .map(|offset| bars.last().unwrap().close.saturating_sub(offset)),
                self.stop_loss_days,
            ))
        } else if short_ma_prev >= long_ma_prev && short_ma < long_ma {
            Some(Signal::sell(symbol, self.position_size))
        } else {
            None
        }
    }
}

impl Strategy for MovingAverageCrossover {
    fn spec(&self) -> StrategySpec {
        StrategySpec::new("moving_average_crossover")
    }

    fn generate_signals(&mut self, provider: &mut TemporalProvider, current_date: NaiveDate) -> Vec<Signal> {
        self.symbols
            .iter()
            .filter_map(|symbol| self.signal_for_symbol(provider, symbol, current_date))
            .collect()
    }
}
