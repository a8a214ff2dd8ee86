//! Temporal gate over a [`PriceRepository`] — the engine's sole point of
//! market-data access, and the subsystem this engine's correctness lives in.
//!
//! Every query is checked against the provider's own simulation clock so
//! that, by construction, no caller can ever observe a bar from a date that
//! lies in the future relative to where the simulation currently stands.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::bar::Bar;
use crate::repository::PriceRepository;

/// Fault raised by the temporal provider. All three kinds are programming
/// errors from the engine's perspective: they abort the run (spec §4.1,
/// §7).
#[derive(Debug)]
pub enum ProviderFault {
    /// `AdvanceTime` was called with a date earlier than the current clock.
    ClockRegression { attempted: NaiveDate, current: NaiveDate },
    /// A query referenced a date later than the current simulation clock.
    FutureDataAccess { requested: NaiveDate, current: NaiveDate },
    /// No bar exists at or before the requested date, or the symbol is unknown.
    DataNotFound { symbol: String, as_of: NaiveDate },
}

impl std::fmt::Display for ProviderFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderFault::ClockRegression { attempted, current } => write!(
                f,
                "clock regression: attempted to advance to {attempted} but clock is already at {current}"
            ),
            ProviderFault::FutureDataAccess { requested, current } => write!(
                f,
                "future data access: requested {requested} but clock is at {current}"
            ),
            ProviderFault::DataNotFound { symbol, as_of } => {
                write!(f, "no data for {symbol} at or before {as_of}")
            }
        }
    }
}

impl std::error::Error for ProviderFault {}

/// Time-gated access to historical bars.
///
/// Owns the simulation clock. Caches each symbol's full bar history on
/// first access (load-once, sorted ascending by [`PriceRepository`]
/// contract) and re-filters by `current_time` on every read, so the cache
/// itself never needs invalidation on `advance_time`.
pub struct TemporalProvider {
    repository: Box<dyn PriceRepository>,
    current_time: NaiveDate,
    cache: HashMap<String, Vec<Bar>>,
}

impl TemporalProvider {
    pub fn new(repository: Box<dyn PriceRepository>, start_time: NaiveDate) -> Self {
        Self {
            repository,
            current_time: start_time,
            cache: HashMap::new(),
        }
    }

    pub fn current_time(&self) -> NaiveDate {
        self.current_time
    }

    /// Set the simulation clock to `t`. Fails if `t` moves the clock
    /// backward.
    pub fn advance_time(&mut self, t: NaiveDate) -> Result<(), ProviderFault> {
        if t < self.current_time {
            return Err(ProviderFault::ClockRegression {
                attempted: t,
                current: self.current_time,
            });
        }
        self.current_time = t;
        Ok(())
    }

    fn bars_for(&mut self, symbol: &str) -> &[Bar] {
        self.cache
            .entry(symbol.to_string())
            .or_insert_with(|| self.repository.load_all_bars(symbol))
    }

    /// Returns the most recent bar at date <= `as_of`.
    ///
    /// Fails with `FutureDataAccess` if `as_of > current_time`; fails with
    /// `DataNotFound` if no bar exists at or before `as_of`, or the symbol
    /// is unknown.
    pub fn get_bar(&mut self, symbol: &str, as_of: NaiveDate) -> Result<Bar, ProviderFault> {
        if as_of > self.current_time {
            return Err(ProviderFault::FutureDataAccess {
                requested: as_of,
                current: self.current_time,
            });
        }
        let bars = self.bars_for(symbol);
        // `bars` is sorted ascending by date; the most recent bar with
        // date <= as_of is the last element of that prefix.
        match bars.iter().rev().find(|b| b.date <= as_of) {
            Some(bar) => Ok(bar.clone()),
            None => Err(ProviderFault::DataNotFound {
                symbol: symbol.to_string(),
                as_of,
            }),
        }
    }

    /// Returns bars with `from <= date <= min(to, current_time)`, ascending.
    ///
    /// Not an error if `to` exceeds `current_time` — the window is silently
    /// clamped. If `from` exceeds `current_time` the result is empty.
    pub fn get_historical_bars(&mut self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<Bar> {
        let effective_to = to.min(self.current_time);
        if from > effective_to {
            return Vec::new();
        }
        self.bars_for(symbol)
            .iter()
            .filter(|b| b.date >= from && b.date <= effective_to)
            .cloned()
            .collect()
    }

    /// Whether `symbol` has any bar at or before `as_of`.
    ///
    /// Subject to the same future-access fence as [`Self::get_bar`]: asking
    /// about a date beyond the clock is a fault, not a silent `false`.
    pub fn is_symbol_available(&mut self, symbol: &str, as_of: NaiveDate) -> Result<bool, ProviderFault> {
        if as_of > self.current_time {
            return Err(ProviderFault::FutureDataAccess {
                requested: as_of,
                current: self.current_time,
            });
        }
        Ok(self.bars_for(symbol).iter().any(|b| b.date <= as_of))
    }
}
