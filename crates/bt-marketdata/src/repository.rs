//! Price Repository — the port the temporal provider (C1) sits in front of.
//!
//! No temporal gating lives here; gating is the provider's sole
//! responsibility (spec: "no temporal gating in the repository").

use std::collections::BTreeMap;

use crate::bar::Bar;

/// Persistent per-symbol bar storage, abstract to the simulation core.
///
/// Implementations must sort by date ascending and deduplicate on
/// (symbol, date) using the last writer. Implementations must be safe for
/// concurrent reads across parallel backtest runs.
pub trait PriceRepository: Send + Sync {
    /// Load every known bar for `symbol`, ascending by date, deduplicated.
    fn load_all_bars(&self, symbol: &str) -> Vec<Bar>;
}

/// A `PriceRepository` backed by an in-memory map.
///
/// This is the reference adapter used by tests and the CLI demo. Real
/// deployments populate a durable repository via an external CSV loader;
/// that ingestion path is outside the core (see spec §1).
#[derive(Default)]
pub struct InMemoryPriceRepository {
    bars: BTreeMap<String, Vec<Bar>>,
}

impl InMemoryPriceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bar, maintaining ascending-date order and
    /// last-writer-wins deduplication on (symbol, date).
    pub fn insert(&mut self, bar: Bar) {
        let entries = self.bars.entry(bar.symbol.clone()).or_default();
        match entries.iter().position(|b| b.date == bar.date) {
            Some(idx) => entries[idx] = bar,
            None => entries.push(bar),
        }
        entries.sort_by_key(|b| b.date);
    }

    pub fn extend(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.insert(bar);
        }
    }
}

impl PriceRepository for InMemoryPriceRepository {
    fn load_all_bars(&self, symbol: &str) -> Vec<Bar> {
        self.bars.get(symbol).cloned().unwrap_or_default()
    }
}
