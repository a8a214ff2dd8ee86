//! Bar ingestion — spec §6's CSV format, consumed by the host process, not
//! by the simulation core itself. Grounded on `mqk-backtest`'s CSV loader:
//! explicit error enum, deterministic parsing, header-driven column lookup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bt_marketdata::Bar;
use bt_money::Micros;
use chrono::NaiveDate;

const REQUIRED_HEADERS: &[&str] = &["Date", "Open", "High", "Low", "Close", "AdjustedClose", "Volume"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    EmptyInput,
    MissingHeader(&'static str),
    BadRow { line: usize, reason: String },
    Io(String),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::EmptyInput => write!(f, "empty input"),
            LoadError::MissingHeader(h) => write!(f, "missing header: {h}"),
            LoadError::BadRow { line, reason } => write!(f, "bad row at line {line}: {reason}"),
            LoadError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

pub fn load_csv_file(symbol: &str, path: impl AsRef<Path>) -> Result<Vec<Bar>, LoadError> {
    let s = fs::read_to_string(path)?;
    parse_csv_bars(symbol, &s)
}

/// Parses one symbol's bars from CSV content shaped as spec §6 describes:
/// `Date,Open,High,Low,Close,AdjustedClose,Volume,Macd,MacdSignal,MacdHistogram,Sma200,Sma50,VolMA20,Rsi14`.
/// Empty indicator cells mean "unknown" and become `None`.
pub fn parse_csv_bars(symbol: &str, csv: &str) -> Result<Vec<Bar>, LoadError> {
    let mut lines = csv.lines();

    let header_line = lines.next().ok_or(LoadError::EmptyInput)?;
    let header_line = header_line.trim().trim_start_matches('\u{feff}');
    if header_line.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let headers: Vec<String> = header_line.split(',').map(|s| s.trim().to_string()).collect();
    let mut idx: BTreeMap<String, usize> = BTreeMap::new();
    for (i, h) in headers.iter().enumerate() {
        idx.insert(h.clone(), i);
    }
    for required in REQUIRED_HEADERS {
        if !idx.contains_key(*required) {
            return Err(LoadError::MissingHeader(required));
        }
    }

    let col = |name: &str| -> usize { idx[name] };
    let optional_col = |name: &str| -> Option<usize> { idx.get(name).copied() };

    let col_date = col("Date");
    let col_open = col("Open");
    let col_high = col("High");
    let col_low = col("Low");
    let col_close = col("Close");
    let col_adj_close = col("AdjustedClose");
    let col_volume = col("Volume");
    let col_macd = optional_col("Macd");
    let col_macd_signal = optional_col("MacdSignal");
    let col_macd_histogram = optional_col("MacdHistogram");
    let col_sma50 = optional_col("Sma50");
    let col_sma200 = optional_col("Sma200");
    let col_vol_ma20 = optional_col("VolMA20");
    let col_rsi14 = optional_col("Rsi14");

    let mut out = Vec::new();
    for (line_idx0, raw) in lines.enumerate() {
        let line_no = line_idx0 + 2;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let fields: Vec<&str> = raw.split(',').map(|s| s.trim()).collect();
        let get = |column: usize| -> Result<&str, LoadError> {
            fields.get(column).copied().ok_or_else(|| LoadError::BadRow {
                line: line_no,
                reason: format!("missing column index {column}"),
            })
        };
        let bad_row = |reason: String| LoadError::BadRow { line: line_no, reason };

        let date = NaiveDate::parse_from_str(get(col_date)?, "%Y-%m-%d")
            .map_err(|e| bad_row(format!("invalid date: {e}")))?;
        let open = parse_price(get(col_open)?).map_err(|e| bad_row(e))?;
        let high = parse_price(get(col_high)?).map_err(|e| bad_row(e))?;
        let low = parse_price(get(col_low)?).map_err(|e| bad_row(e))?;
        let close = parse_price(get(col_close)?).map_err(|e| bad_row(e))?;
        let adjusted_close = parse_price(get(col_adj_close)?).map_err(|e| bad_row(e))?;
        let volume: i64 = get(col_volume)?.parse().map_err(|_| bad_row("invalid volume".to_string()))?;

        let bar = Bar::new(symbol, date, open, high, low, close, adjusted_close, volume)
            .map_err(|e| bad_row(e.to_string()))?;

        let indicator = |column: Option<usize>| -> Result<Option<f64>, LoadError> {
            match column {
                Some(c) => {
                    let raw = get(c)?;
                    if raw.is_empty() {
                        Ok(None)
                    } else {
                        raw.parse::<f64>().map(Some).map_err(|_| bad_row(format!("invalid indicator value: {raw}")))
                    }
                }
                None => Ok(None),
            }
        };

        let bar = bar.with_indicators(
            indicator(col_macd)?,
            indicator(col_macd_signal)?,
            indicator(col_macd_histogram)?,
            indicator(col_sma50)?,
            indicator(col_sma200)?,
            indicator(col_vol_ma20)?,
            indicator(col_rsi14)?,
        );
        out.push(bar);
    }

    out.sort_by_key(|b| b.date);
    Ok(out)
}

fn parse_price(raw: &str) -> Result<Micros, String> {
    bt_schemas::parse_micros(raw).map_err(|e| e.to_string())
}
