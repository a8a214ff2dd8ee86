//! bt-backtest
//!
//! The driver (C8) that ties every other component together into a single
//! run, the metrics calculator (C9), and the result model (C10). A run
//! builds its own Account/Position/Trade/Snapshot state and its own
//! provider instance; the only thing it shares with other concurrent runs
//! is the read-only repository passed in.

mod cancellation;
mod driver;
mod metrics;
mod types;

pub use cancellation::CancellationToken;
pub use driver::BacktestDriver;
pub use metrics::compute_metrics;
pub use types::{BacktestConfig, BacktestResult, DailySnapshot, EngineFault, Metrics, RunStatus, Trade};
