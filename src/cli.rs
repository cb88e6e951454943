//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    cash_floor, policy_kind, shortfall, strategy_kind, validate_config, PolicyKind, StrategyKind,
};
use crate::domain::cost::Commission;
use crate::domain::error::SigfolioError;
use crate::domain::metrics::{PerformanceReport, ReportConfig, TRADING_DAYS_PER_YEAR};
use crate::domain::portfolio::SimulatorConfig;
use crate::domain::sizing::{SizingConfig, SizingPolicy};
use crate::domain::strategy::{MovingAverageCross, SignalTable, Strategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "sigfolio", about = "Signal-driven portfolio backtester")]
pub struct Cli {
    /// Log every sizing decision and fill
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(short, long)]
        signals: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            prices,
            signals,
            output,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from("equity.csv"));
            run_backtest_command(&config, prices, signals, &output)
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install a stderr subscriber. A subscriber that is already installed wins.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SigfolioError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

fn run_validate(config_path: &Path) -> Result<(), SigfolioError> {
    let adapter = load_config(config_path)?;
    build_backtest_config(&adapter)?;
    eprintln!("Config validated successfully");
    Ok(())
}

fn run_backtest_command(
    config_path: &Path,
    prices_path: PathBuf,
    signals_path: Option<PathBuf>,
    output_path: &Path,
) -> Result<(), SigfolioError> {
    let adapter = load_config(config_path)?;
    let data_port = CsvAdapter::new(prices_path, signals_path);
    let report_port = CsvReportAdapter::new();

    let result = run_backtest_pipeline(&adapter, &data_port, &report_port, output_path)?;
    print_summary(&result.report);
    eprintln!("\nEquity curve written to: {}", output_path.display());
    Ok(())
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SigfolioError> {
    validate_config(adapter)?;

    let policy = match policy_kind(adapter)? {
        PolicyKind::FixedFraction => SizingPolicy::FixedFraction {
            fraction: adapter.get_double("sizing", "fraction", 0.1),
        },
        PolicyKind::FixedQuantity => SizingPolicy::FixedQuantity {
            quantity: adapter.get_double("sizing", "quantity", 1.0),
        },
    };
    let whole_units = adapter.get_bool("sizing", "whole_units", true);

    let config = BacktestConfig {
        initial_cash: adapter.get_double("backtest", "initial_cash", 0.0),
        sizing: SizingConfig {
            policy,
            whole_units,
            allow_shorting: adapter.get_bool("sizing", "allow_shorting", true),
        },
        execution: SimulatorConfig {
            slippage_pct: adapter.get_double("execution", "slippage_pct", 0.0),
            cash_floor: cash_floor(adapter)?,
            shortfall: shortfall(adapter)?,
            whole_units,
        },
        commission: Commission {
            per_trade: adapter.get_double("execution", "commission_per_trade", 0.0),
            pct: adapter.get_double("execution", "commission_pct", 0.0),
        },
        report: ReportConfig {
            periods_per_year: adapter.get_double(
                "backtest",
                "periods_per_year",
                TRADING_DAYS_PER_YEAR,
            ),
            risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
        },
    };
    config.validate()?;
    Ok(config)
}

pub fn build_strategy(
    adapter: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Box<dyn Strategy>, SigfolioError> {
    match strategy_kind(adapter)? {
        StrategyKind::Signals => {
            let signals = data_port.load_signals()?;
            info!(signals = signals.len(), "loaded signals");
            Ok(Box::new(SignalTable::from_signals(&signals)?))
        }
        StrategyKind::MovingAverageCross => {
            let short = adapter.get_int("strategy", "short_window", 20);
            let long = adapter.get_int("strategy", "long_window", 50);
            let to_window = |key: &str, value: i64| {
                usize::try_from(value).map_err(|_| SigfolioError::Configuration {
                    parameter: key.to_string(),
                    reason: format!("{key} must be non-negative"),
                })
            };
            Ok(Box::new(MovingAverageCross::new(
                to_window("short_window", short)?,
                to_window("long_window", long)?,
            )?))
        }
    }
}

/// Load inputs, run every stage, then hand the result to the report port.
pub fn run_backtest_pipeline(
    adapter: &dyn ConfigPort,
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    output_path: &Path,
) -> Result<BacktestResult, SigfolioError> {
    let config = build_backtest_config(adapter)?;
    let prices = data_port.load_prices()?;
    info!(dates = prices.len(), instruments = prices.instruments().len(), "loaded prices");

    let strategy = build_strategy(adapter, data_port)?;
    let result = run_backtest(strategy.as_ref(), &prices, &config)?;

    report_port.write(&result, output_path)?;
    Ok(result)
}

fn print_summary(report: &PerformanceReport) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:     {:.2}", report.final_equity);
    eprintln!("Total Return:     {:.2}%", report.cumulative_return * 100.0);
    eprintln!("Annualized:       {:.2}%", report.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", report.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", report.max_drawdown * 100.0);
    eprintln!("Periods:          {}", report.returns.len());
}
