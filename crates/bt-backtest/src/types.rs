use bt_money::Micros;
use bt_strategy::Side;
use chrono::NaiveDate;

/// Inputs to one backtest run.
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestConfig {
    pub account_id: u64,
    pub account_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: Micros,
    pub symbols: Vec<String>,
}

impl BacktestConfig {
    pub fn new(
        account_id: u64,
        account_name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_capital: Micros,
        symbols: Vec<String>,
    ) -> Self {
        Self {
            account_id,
            account_name: account_name.into(),
            start_date,
            end_date,
            initial_capital,
            symbols,
        }
    }
}

/// One filled order.
#[derive(Clone, Debug, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: Micros,
    pub commission: Micros,
    pub position_id: u64,
    pub exit_reason: Option<String>,
}

/// End-of-day mark of the account.
#[derive(Clone, Debug, PartialEq)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub cash: Micros,
    pub positions_value: Micros,
    pub total_equity: Micros,
    pub open_positions: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Aborted,
    Canceled,
}

/// The aggregate performance block C9 computes over the run's trades and
/// snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct Metrics {
    pub final_equity: Micros,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub total_trades: usize,
}

/// Why a run aborted. The §7 error taxonomy names several fault kinds
/// (`FutureDataAccess`, `ClockRegression`, `DataNotFound`, `UnknownSymbol`,
/// `InvariantBreach`) but a single policy for all of them: abort and report.
/// A caller has nothing useful to branch on beyond that, so the driver
/// collapses them to one reporting type rather than re-deriving the
/// component-specific enum at this boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineFault {
    pub message: String,
}

impl std::fmt::Display for EngineFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<bt_marketdata::ProviderFault> for EngineFault {
    fn from(err: bt_marketdata::ProviderFault) -> Self {
        EngineFault { message: err.to_string() }
    }
}

/// A plain record with no references into engine internals — it is safe to
/// serialize or compare across runs (spec §4.10: determinism is a testable
/// property).
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestResult {
    /// The config that produced this result, echoed back so a result is
    /// self-describing once it outlives the driver that built it.
    pub config: BacktestConfig,
    pub status: RunStatus,
    pub fault: Option<EngineFault>,
    pub metrics: Metrics,
    pub trades: Vec<Trade>,
    pub daily_snapshots: Vec<DailySnapshot>,
}
