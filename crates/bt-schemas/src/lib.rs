//! bt-schemas
//!
//! Plain serde DTOs for the thin JSON boundary described in spec §6. Money
//! fields cross this boundary as decimal strings, not floats or raw micros —
//! the same convention `mqk-schemas` uses for its broker/event payloads.
//!
//! Nothing in the simulation core depends on this crate; it exists purely at
//! the edge, for `bt-cli` (or any future HTTP collaborator) to translate
//! between JSON and the domain types in `bt-backtest`/`bt-strategy`.

mod decimal;

use bt_backtest::{BacktestConfig, BacktestResult, DailySnapshot, RunStatus, Trade};
use bt_money::Micros;
use bt_strategy::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use decimal::{format_micros, parse_micros, DecimalError};

/// Input — spec §6's `BacktestConfig` JSON-shaped record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestConfigDto {
    pub account_id: u64,
    #[serde(default = "default_account_name")]
    pub account_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: String,
    pub symbols: Vec<String>,
    pub strategy: StrategyConfigDto,
}

fn default_account_name() -> String {
    "backtest".to_string()
}

/// `strategy: { type: string, params: object }`. Only `moving_average_crossover`
/// is wired to a concrete strategy today; an unrecognized `type` is a
/// deserialization error rather than a silently-ignored field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum StrategyConfigDto {
    MovingAverageCrossover(MovingAverageCrossoverParamsDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverageCrossoverParamsDto {
    pub short_period: usize,
    pub long_period: usize,
    pub position_size: i64,
    pub stop_loss: Option<StopLossDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopLossDto {
    pub price_offset: String,
    pub days: i64,
}

impl BacktestConfigDto {
    /// Parses the decimal-string fields, producing the domain `BacktestConfig`
    /// this crate never otherwise constructs.
    pub fn to_domain(&self) -> Result<bt_backtest::BacktestConfig, DecimalError> {
        let initial_capital = decimal::parse_micros(&self.initial_capital)?;
        Ok(bt_backtest::BacktestConfig::new(
            self.account_id,
            self.account_name.clone(),
            self.start_date,
            self.end_date,
            initial_capital,
            self.symbols.clone(),
        ))
    }
}

/// Output — spec §6's `BacktestResult` JSON-shaped record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResultDto {
    pub config: BacktestConfigEchoDto,
    pub status: RunStatusDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    pub final_equity: String,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub trades: Vec<TradeDto>,
    pub daily_snapshots: Vec<DailySnapshotDto>,
}

/// The `BacktestConfig` a result was produced from, echoed back so the
/// result is self-describing once it outlives the driver that built it
/// (spec §3: `BacktestResult` carries a config echo alongside its metrics).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestConfigEchoDto {
    pub account_id: u64,
    pub account_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: String,
    pub symbols: Vec<String>,
}

impl From<&BacktestConfig> for BacktestConfigEchoDto {
    fn from(config: &BacktestConfig) -> Self {
        BacktestConfigEchoDto {
            account_id: config.account_id,
            account_name: config.account_name.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            initial_capital: decimal::format_micros(config.initial_capital),
            symbols: config.symbols.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatusDto {
    Completed,
    Aborted,
    Canceled,
}

impl From<RunStatus> for RunStatusDto {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => RunStatusDto::Completed,
            RunStatus::Aborted => RunStatusDto::Aborted,
            RunStatus::Canceled => RunStatusDto::Canceled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideDto {
    Buy,
    Sell,
}

impl From<Side> for SideDto {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => SideDto::Buy,
            Side::Sell => SideDto::Sell,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: SideDto,
    pub quantity: i64,
    pub price: String,
    pub commission: String,
    pub position_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<String>,
}

impl From<&Trade> for TradeDto {
    fn from(trade: &Trade) -> Self {
        TradeDto {
            date: trade.date,
            symbol: trade.symbol.clone(),
            side: trade.side.into(),
            quantity: trade.quantity,
            price: decimal::format_micros(trade.price),
            commission: decimal::format_micros(trade.commission),
            position_id: trade.position_id,
            exit_reason: trade.exit_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshotDto {
    pub date: NaiveDate,
    pub cash: String,
    pub positions_value: String,
    pub total_equity: String,
    pub open_positions: usize,
}

impl From<&DailySnapshot> for DailySnapshotDto {
    fn from(snapshot: &DailySnapshot) -> Self {
        DailySnapshotDto {
            date: snapshot.date,
            cash: decimal::format_micros(snapshot.cash),
            positions_value: decimal::format_micros(snapshot.positions_value),
            total_equity: decimal::format_micros(snapshot.total_equity),
            open_positions: snapshot.open_positions,
        }
    }
}

impl From<&BacktestResult> for BacktestResultDto {
    fn from(result: &BacktestResult) -> Self {
        BacktestResultDto {
            config: BacktestConfigEchoDto::from(&result.config),
            status: result.status.into(),
            fault: result.fault.as_ref().map(|f| f.to_string()),
            final_equity: decimal::format_micros(result.metrics.final_equity),
            total_return: result.metrics.total_return,
            max_drawdown: result.metrics.max_drawdown,
            sharpe_ratio: result.metrics.sharpe_ratio,
            win_rate: result.metrics.win_rate,
            total_trades: result.metrics.total_trades,
            trades: result.trades.iter().map(TradeDto::from).collect(),
            daily_snapshots: result.daily_snapshots.iter().map(DailySnapshotDto::from).collect(),
        }
    }
}

/// Parses a `MovingAverageCrossoverParamsDto` into the strategy's
/// constructor arguments, resolving the optional stop-loss fields.
pub fn moving_average_params(
    params: &MovingAverageCrossoverParamsDto,
) -> Result<(usize, usize, i64, Option<Micros>, Option<i64>), DecimalError> {
    let (stop_loss_price_offset, stop_loss_days) = match &params.stop_loss {
        Some(stop_loss) => (Some(decimal::parse_micros(&stop_loss.price_offset)?), Some(stop_loss.days)),
        None => (None, None),
    };
    Ok((
        params.short_period,
        params.long_period,
        params.position_size,
        stop_loss_price_offset,
        stop_loss_days,
    ))
}
