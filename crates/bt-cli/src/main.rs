//! bt-cli
//!
//! A thin host process around the simulation core: load a JSON
//! `BacktestConfig`, load one CSV bar file per configured symbol, run the
//! backtest, print the `BacktestResult` as JSON. No database, no broker, no
//! daemon — those belong to a different collaborator (spec §6).

mod csv_loader;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bt_execution::FlatFee;
use bt_marketdata::InMemoryPriceRepository;
use bt_backtest::BacktestDriver;
use bt_schemas::{BacktestConfigDto, BacktestResultDto, StrategyConfigDto};
use bt_strategy::MovingAverageCrossover;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run a single historical backtest from a JSON config and a directory of
/// per-symbol CSV bar files.
#[derive(Parser)]
#[command(name = "bt-cli", about = "Historical strategy backtesting engine", long_about = None)]
struct Cli {
    /// Path to a JSON file matching the `BacktestConfig` shape in spec §6.
    #[arg(long)]
    config: PathBuf,

    /// Directory containing one `<SYMBOL>.csv` file per configured symbol.
    #[arg(long)]
    bars_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();

    let config_json = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config file {}", cli.config.display()))?;
    let config_dto: BacktestConfigDto =
        serde_json::from_str(&config_json).context("parsing backtest config JSON")?;
    let config = config_dto.to_domain().context("converting backtest config to domain types")?;

    let mut repository = InMemoryPriceRepository::new();
    for symbol in &config.symbols {
        let path = cli.bars_dir.join(format!("{symbol}.csv"));
        let bars = csv_loader::load_csv_file(symbol, &path)
            .with_context(|| format!("loading bars for {symbol} from {}", path.display()))?;
        repository.extend(bars);
    }

    let StrategyConfigDto::MovingAverageCrossover(params) = &config_dto.strategy;
    let (short_period, long_period, position_size, stop_loss_price_offset, stop_loss_days) =
        bt_schemas::moving_average_params(params).context("parsing strategy params")?;
    let mut strategy = MovingAverageCrossover::new(short_period, long_period, position_size, config.symbols.clone());
    if stop_loss_price_offset.is_some() || stop_loss_days.is_some() {
        strategy = strategy.with_stop_loss(stop_loss_price_offset, stop_loss_days);
    }

    let commission_model = FlatFee::default();
    let driver = BacktestDriver::new(config);
    let result = driver.run(Box::new(repository), &mut strategy, &commission_model, None);

    let result_dto = BacktestResultDto::from(&result);
    println!("{}", serde_json::to_string_pretty(&result_dto)?);

    Ok(())
}
