use bt_money::Micros;
use chrono::NaiveDate;

/// A single daily OHLCV bar for one symbol, optionally carrying precomputed
/// technical indicators. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Micros,
    pub high: Micros,
    pub low: Micros,
    pub close: Micros,
    pub adjusted_close: Micros,
    pub volume: i64,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub vol_ma20: Option<f64>,
    pub rsi14: Option<f64>,
}

/// A bar that violates the OHLC/volume invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: &'static str,
}

impl std::fmt::Display for InvalidBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid bar for {} on {}: {}",
            self.symbol, self.date, self.reason
        )
    }
}

impl std::error::Error for InvalidBar {}

impl Bar {
    /// Construct a bar, validating the invariants from the data model:
    /// `low <= open, close <= high` and `volume >= 0`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: Micros,
        high: Micros,
        low: Micros,
        close: Micros,
        adjusted_close: Micros,
        volume: i64,
    ) -> Result<Self, InvalidBar> {
        let symbol = symbol.into();
        if low > open || open > high {
            return Err(InvalidBar {
                symbol,
                date,
                reason: "open is not within [low, high]",
            });
        }
        if low > close || close > high {
            return Err(InvalidBar {
                symbol,
                date,
                reason: "close is not within [low, high]",
            });
        }
        if volume < 0 {
            return Err(InvalidBar {
                symbol,
                date,
                reason: "volume is negative",
            });
        }
        Ok(Bar {
            symbol,
            date,
            open,
            high,
            low,
            close,
            adjusted_close,
            volume,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            sma50: None,
            sma200: None,
            vol_ma20: None,
            rsi14: None,
        })
    }

    pub fn with_indicators(
        mut self,
        macd: Option<f64>,
        macd_signal: Option<f64>,
        macd_histogram: Option<f64>,
        sma50: Option<f64>,
        sma200: Option<f64>,
        vol_ma20: Option<f64>,
        rsi14: Option<f64>,
    ) -> Self {
        self.macd = macd;
        self.macd_signal = macd_signal;
        self.macd_histogram = macd_histogram;
        self.sma50 = sma50;
        self.sma200 = sma200;
        self.vol_ma20 = vol_ma20;
        self.rsi14 = rsi14;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn valid_bar_constructs() {
        let bar = Bar::new(
            "AAA",
            d(2024, 1, 2),
            Micros::from_units(100),
            Micros::from_units(110),
            Micros::from_units(95),
            Micros::from_units(105),
            Micros::from_units(105),
            1_000,
        );
        assert!(bar.is_ok());
    }

    #[test]
    fn open_above_high_is_rejected() {
        let bar = Bar::new(
            "AAA",
            d(2024, 1, 2),
            Micros::from_units(200),
            Micros::from_units(110),
            Micros::from_units(95),
            Micros::from_units(105),
            Micros::from_units(105),
            1_000,
        );
        assert!(bar.is_err());
    }

    #[test]
    fn negative_volume_is_rejected() {
        let bar = Bar::new(
            "AAA",
            d(2024, 1, 2),
            Micros::from_units(100),
            Micros::from_units(110),
            Micros::from_units(95),
            Micros::from_units(105),
            Micros::from_units(105),
            -1,
        );
        assert!(bar.is_err());
    }
}
