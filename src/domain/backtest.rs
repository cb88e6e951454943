//! Backtest configuration and the signal → position → equity pipeline.

use tracing::info;

use super::cost::Commission;
use super::error::SigfolioError;
use super::metrics::{PerformanceReport, ReportConfig};
use super::portfolio::{
    Portfolio, PortfolioSimulator, PortfolioState, SimulatedPortfolio, SimulatorConfig,
};
use super::position::Position;
use super::price::PriceFrame;
use super::signal::SignalFrame;
use super::sizing::{validate_initial_cash, PositionSizer, SizingConfig};
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub sizing: SizingConfig,
    /// `whole_units` here is ignored; the simulator follows `sizing.whole_units`.
    pub execution: SimulatorConfig,
    pub commission: Commission,
    pub report: ReportConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: 100_000.0,
            sizing: SizingConfig::default(),
            execution: SimulatorConfig::default(),
            commission: Commission::default(),
            report: ReportConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Reject invalid parameters before any computation runs.
    pub fn validate(&self) -> Result<(), SigfolioError> {
        validate_initial_cash(self.initial_cash)?;
        self.sizing.validate()?;
        self.execution.validate()?;
        self.report.validate()?;
        if let Some(floor) = self.execution.cash_floor {
            if self.initial_cash < floor {
                return Err(SigfolioError::configuration(
                    "cash_floor",
                    format!("initial_cash {} is below cash_floor {floor}", self.initial_cash),
                ));
            }
        }
        if !self.commission.per_trade.is_finite() || self.commission.per_trade < 0.0 {
            return Err(SigfolioError::configuration(
                "commission_per_trade",
                "commission_per_trade must be non-negative",
            ));
        }
        if !self.commission.pct.is_finite() || self.commission.pct < 0.0 {
            return Err(SigfolioError::configuration(
                "commission_pct",
                "commission_pct must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn build_portfolio(&self) -> Result<SimulatedPortfolio<Commission>, SigfolioError> {
        self.validate()?;
        let execution = SimulatorConfig {
            whole_units: self.sizing.whole_units,
            ..self.execution.clone()
        };
        Ok(SimulatedPortfolio::new(
            PositionSizer::new(self.sizing.clone())?,
            PortfolioSimulator::with_cost_model(execution, self.commission)?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub signals: SignalFrame,
    pub positions: Vec<Position>,
    pub states: Vec<PortfolioState>,
    pub report: PerformanceReport,
}

/// Run every stage in order. Any error aborts the run with no partial result.
pub fn run_pipeline<S, P>(
    strategy: &S,
    portfolio: &P,
    prices: &PriceFrame,
    initial_cash: f64,
    report_config: &ReportConfig,
) -> Result<BacktestResult, SigfolioError>
where
    S: Strategy + ?Sized,
    P: Portfolio + ?Sized,
{
    info!(strategy = strategy.name(), dates = prices.len(), "generating signals");
    let signals = strategy.generate_signals(prices)?;

    let positions = portfolio.generate_positions(&signals, prices, initial_cash)?;
    info!(positions = positions.len(), "positions sized");

    let states = portfolio.backtest_portfolio(&positions, prices, initial_cash)?;
    let report = PerformanceReport::summarize(&states, report_config)?;
    info!(
        states = states.len(),
        final_equity = report.final_equity,
        "backtest complete"
    );

    Ok(BacktestResult {
        signals,
        positions,
        states,
        report,
    })
}

/// Validate `config`, build the simulated portfolio it describes and run the
/// pipeline.
pub fn run_backtest(
    strategy: &dyn Strategy,
    prices: &PriceFrame,
    config: &BacktestConfig,
) -> Result<BacktestResult, SigfolioError> {
    let portfolio = config.build_portfolio()?;
    run_pipeline(strategy, &portfolio, prices, config.initial_cash, &config.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Direction, Signal};
    use crate::domain::sizing::SizingPolicy;
    use crate::domain::strategy::SignalTable;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            initial_cash: 1000.0,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(BacktestConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_commission_rejected() {
        let c = BacktestConfig {
            commission: Commission {
                per_trade: -1.0,
                pct: 0.0,
            },
            ..config()
        };
        let err = c.validate().unwrap_err();
        assert!(matches!(
            err,
            SigfolioError::Configuration { parameter, .. } if parameter == "commission_per_trade"
        ));
    }

    #[test]
    fn cash_floor_above_initial_cash_rejected() {
        let c = BacktestConfig {
            execution: SimulatorConfig {
                cash_floor: Some(5000.0),
                ..SimulatorConfig::default()
            },
            ..config()
        };
        let err = c.validate().unwrap_err();
        assert!(matches!(
            err,
            SigfolioError::Configuration { parameter, .. } if parameter == "cash_floor"
        ));
    }

    #[test]
    fn simulator_rounding_follows_sizer() {
        let c = BacktestConfig {
            sizing: SizingConfig {
                whole_units: false,
                ..SizingConfig::default()
            },
            ..config()
        };
        let portfolio = c.build_portfolio().unwrap();
        assert!(!portfolio.simulator.config().whole_units);
    }

    #[test]
    fn fractional_sizing_clips_to_fractional_fill() {
        let c = BacktestConfig {
            sizing: SizingConfig {
                policy: SizingPolicy::FixedQuantity { quantity: 150.5 },
                whole_units: false,
                allow_shorting: true,
            },
            ..config()
        };
        let strategy =
            SignalTable::from_signals(&[Signal::new(date(1), "A", Direction::Long)]).unwrap();
        let mut prices = PriceFrame::new();
        prices.insert(date(1), "A", 7.0).unwrap();

        let result = run_backtest(&strategy, &prices, &c).unwrap();
        let filled = result.states[0].quantity("A");
        assert!((filled - 1000.0 / 7.0).abs() < 1e-6, "filled {filled}");
        assert!(result.states[0].cash >= -1e-9);
    }

    #[test]
    fn invalid_sizing_rejected_before_run() {
        let c = BacktestConfig {
            sizing: SizingConfig {
                policy: SizingPolicy::FixedFraction { fraction: -0.5 },
                ..SizingConfig::default()
            },
            ..config()
        };
        let strategy = SignalTable::default();
        let err = run_backtest(&strategy, &PriceFrame::new(), &c).unwrap_err();
        assert!(matches!(err, SigfolioError::Configuration { .. }));
    }

    #[test]
    fn single_signal_scenario() {
        let strategy =
            SignalTable::from_signals(&[Signal::new(date(1), "A", Direction::Long)]).unwrap();
        let mut prices = PriceFrame::new();
        prices.insert(date(1), "A", 10.0).unwrap();

        let result = run_backtest(&strategy, &prices, &config()).unwrap();
        assert_eq!(result.positions, vec![Position::new(date(1), "A", 10.0)]);
        assert_eq!(result.states.len(), 1);
        assert!((result.states[0].cash - 900.0).abs() < 1e-9);
        assert!((result.states[0].total_equity - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn empty_signals_yield_opening_state() {
        let result = run_backtest(&SignalTable::default(), &PriceFrame::new(), &config()).unwrap();
        assert_eq!(result.states, vec![PortfolioState::opening(1000.0)]);
        assert!(result.report.returns.is_empty());
        assert!(result.report.sharpe_ratio.is_nan());
    }
}
