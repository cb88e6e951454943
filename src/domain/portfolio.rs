//! Portfolio simulation: replays target positions over the price history,
//! tracking cash, holdings and equity.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::cost::{CostModel, ZeroCost};
use super::error::SigfolioError;
use super::position::Position;
use super::price::PriceFrame;
use super::signal::SignalFrame;
use super::sizing::{validate_initial_cash, PositionSizer};

const CASH_TOLERANCE: f64 = 1e-9;
const CLIP_ITERATIONS: usize = 100;

/// What to do when a trade would push cash below the floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Shortfall {
    /// Shrink the trade to the largest affordable quantity.
    #[default]
    Clip,
    /// Abort the run with [`SigfolioError::InsufficientCash`].
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub slippage_pct: f64,
    /// Lowest permitted cash balance; `None` allows unbounded borrowing.
    pub cash_floor: Option<f64>,
    pub shortfall: Shortfall,
    /// Clipped trades are floored to whole units.
    pub whole_units: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            slippage_pct: 0.0,
            cash_floor: Some(0.0),
            shortfall: Shortfall::Clip,
            whole_units: true,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), SigfolioError> {
        if !self.slippage_pct.is_finite() || self.slippage_pct < 0.0 || self.slippage_pct >= 100.0 {
            return Err(SigfolioError::configuration(
                "slippage_pct",
                format!("slippage_pct must be in [0, 100), got {}", self.slippage_pct),
            ));
        }
        if let Some(floor) = self.cash_floor {
            if !floor.is_finite() {
                return Err(SigfolioError::configuration(
                    "cash_floor",
                    "cash_floor must be finite",
                ));
            }
        }
        Ok(())
    }
}

/// Portfolio snapshot at the close of one date.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    /// `None` only for the opening state of a run with no dates.
    pub date: Option<NaiveDate>,
    pub cash: f64,
    pub holdings: BTreeMap<String, f64>,
    pub total_equity: f64,
}

impl PortfolioState {
    pub fn opening(initial_cash: f64) -> Self {
        PortfolioState {
            date: None,
            cash: initial_cash,
            holdings: BTreeMap::new(),
            total_equity: initial_cash,
        }
    }

    pub fn quantity(&self, instrument: &str) -> f64 {
        self.holdings.get(instrument).copied().unwrap_or(0.0)
    }

    /// Signed market value of all holdings.
    pub fn holdings_value(&self) -> f64 {
        self.total_equity - self.cash
    }
}

/// Mutable cash and holdings while a run is in progress.
#[derive(Debug, Clone)]
struct Ledger {
    cash: f64,
    holdings: BTreeMap<String, f64>,
}

impl Ledger {
    fn new(initial_cash: f64) -> Self {
        Ledger {
            cash: initial_cash,
            holdings: BTreeMap::new(),
        }
    }

    fn quantity(&self, instrument: &str) -> f64 {
        self.holdings.get(instrument).copied().unwrap_or(0.0)
    }

    fn set_quantity(&mut self, instrument: &str, quantity: f64) {
        if quantity == 0.0 {
            self.holdings.remove(instrument);
        } else {
            self.holdings.insert(instrument.to_string(), quantity);
        }
    }

    fn snapshot(
        &self,
        date: NaiveDate,
        prices: &BTreeMap<String, f64>,
    ) -> Result<PortfolioState, SigfolioError> {
        let mut holdings_value = 0.0;
        for (instrument, &quantity) in &self.holdings {
            let price = prices.get(instrument).ok_or_else(|| {
                SigfolioError::alignment(format!("no price for held {instrument} on {date}"))
            })?;
            holdings_value += quantity * price;
        }
        Ok(PortfolioState {
            date: Some(date),
            cash: self.cash,
            holdings: self.holdings.clone(),
            total_equity: self.cash + holdings_value,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioSimulator<C = ZeroCost> {
    config: SimulatorConfig,
    cost_model: C,
}

impl PortfolioSimulator<ZeroCost> {
    pub fn new(config: SimulatorConfig) -> Result<Self, SigfolioError> {
        Self::with_cost_model(config, ZeroCost)
    }
}

impl<C: CostModel> PortfolioSimulator<C> {
    pub fn with_cost_model(config: SimulatorConfig, cost_model: C) -> Result<Self, SigfolioError> {
        config.validate()?;
        Ok(PortfolioSimulator { config, cost_model })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Buys pay up, sells receive less.
    pub fn execution_price(&self, market_price: f64, quantity: f64) -> f64 {
        if quantity > 0.0 {
            market_price * (1.0 + self.config.slippage_pct / 100.0)
        } else {
            market_price * (1.0 - self.config.slippage_pct / 100.0)
        }
    }

    fn checked_cost(&self, quantity: f64, price: f64) -> Result<f64, SigfolioError> {
        let cost = self.cost_model.cost(quantity, price);
        if !cost.is_finite() || cost < 0.0 {
            return Err(SigfolioError::configuration(
                "cost_model",
                format!("cost must be finite and non-negative, got {cost}"),
            ));
        }
        Ok(cost)
    }

    /// Net cash leaving the account for trading `quantity` at `price`.
    fn cash_needed(&self, quantity: f64, price: f64) -> Result<f64, SigfolioError> {
        Ok(quantity * price + self.checked_cost(quantity, price)?)
    }

    /// Largest trade in the direction of `quantity` whose cash need fits
    /// within `budget`.
    fn affordable_quantity(
        &self,
        quantity: f64,
        price: f64,
        budget: f64,
    ) -> Result<f64, SigfolioError> {
        let sign = quantity.signum();
        let mut lo = 0.0_f64;
        let mut hi = quantity.abs();
        for _ in 0..CLIP_ITERATIONS {
            let mid = (lo + hi) / 2.0;
            if self.cash_needed(sign * mid, price)? <= budget {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        if self.config.whole_units {
            let mut units = (lo + 1e-6).floor().min(quantity.abs());
            if units > 0.0 && self.cash_needed(sign * units, price)? > budget + CASH_TOLERANCE {
                units -= 1.0;
            }
            lo = units.max(0.0);
        }

        if lo > 0.0 && self.cash_needed(sign * lo, price)? > budget + CASH_TOLERANCE {
            return Ok(0.0);
        }
        Ok(sign * lo)
    }

    fn rebalance(
        &self,
        ledger: &mut Ledger,
        date: NaiveDate,
        target: &Position,
        prices: &BTreeMap<String, f64>,
    ) -> Result<(), SigfolioError> {
        let instrument = target.instrument.as_str();
        let market_price = prices.get(instrument).copied().ok_or_else(|| {
            SigfolioError::alignment(format!("no price for {instrument} on {date}"))
        })?;

        let held = ledger.quantity(instrument);
        let delta = target.quantity - held;
        if delta == 0.0 {
            return Ok(());
        }

        let price = self.execution_price(market_price, delta);
        let mut trade = delta;
        let mut new_quantity = target.quantity;

        if let Some(floor) = self.config.cash_floor {
            let needed = self.cash_needed(delta, price)?;
            let budget = ledger.cash - floor;
            if needed > budget + CASH_TOLERANCE {
                match self.config.shortfall {
                    Shortfall::Reject => {
                        return Err(SigfolioError::InsufficientCash {
                            date,
                            instrument: instrument.to_string(),
                            required: needed,
                            available: budget,
                        });
                    }
                    Shortfall::Clip => {
                        trade = self.affordable_quantity(delta, price, budget)?;
                        new_quantity = held + trade;
                        warn!(
                            %date,
                            instrument,
                            requested = delta,
                            filled = trade,
                            "trade clipped to available cash"
                        );
                    }
                }
            }
        }

        if trade == 0.0 {
            return Ok(());
        }

        let cost = self.checked_cost(trade, price)?;
        ledger.cash -= trade * price + cost;
        ledger.set_quantity(instrument, new_quantity);
        debug!(%date, instrument, quantity = trade, price, cost, cash = ledger.cash, "filled");
        Ok(())
    }

    /// Replay `positions` over `prices`, producing one state per price date.
    ///
    /// With no price dates at all the result is the single opening state.
    pub fn backtest_portfolio(
        &self,
        positions: &[Position],
        prices: &PriceFrame,
        initial_cash: f64,
    ) -> Result<Vec<PortfolioState>, SigfolioError> {
        self.config.validate()?;
        validate_initial_cash(initial_cash)?;
        if let Some(floor) = self.config.cash_floor {
            if initial_cash < floor {
                return Err(SigfolioError::configuration(
                    "cash_floor",
                    format!("initial_cash {initial_cash} is below cash_floor {floor}"),
                ));
            }
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<&Position>> = BTreeMap::new();
        let mut last_date: Option<NaiveDate> = None;
        for position in positions {
            if let Some(prev) = last_date {
                if position.date < prev {
                    return Err(SigfolioError::alignment(format!(
                        "positions out of order: {} follows {}",
                        position.date, prev
                    )));
                }
            }
            last_date = Some(position.date);
            if !prices.contains_date(position.date) {
                return Err(SigfolioError::alignment(format!(
                    "position date {} has no prices",
                    position.date
                )));
            }
            by_date.entry(position.date).or_default().push(position);
        }

        if prices.is_empty() {
            return Ok(vec![PortfolioState::opening(initial_cash)]);
        }

        let mut ledger = Ledger::new(initial_cash);
        let mut states = Vec::with_capacity(prices.len());

        for (date, row) in prices.iter() {
            if let Some(targets) = by_date.get(&date) {
                for target in targets {
                    self.rebalance(&mut ledger, date, target, row)?;
                }
            }
            states.push(ledger.snapshot(date, row)?);
        }

        Ok(states)
    }
}

/// A portfolio turns signals into positions and positions into an equity
/// curve.
pub trait Portfolio {
    fn generate_positions(
        &self,
        signals: &SignalFrame,
        prices: &PriceFrame,
        initial_cash: f64,
    ) -> Result<Vec<Position>, SigfolioError>;

    fn backtest_portfolio(
        &self,
        positions: &[Position],
        prices: &PriceFrame,
        initial_cash: f64,
    ) -> Result<Vec<PortfolioState>, SigfolioError>;
}

/// Sizer and simulator composed into a [`Portfolio`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedPortfolio<C = ZeroCost> {
    pub sizer: PositionSizer,
    pub simulator: PortfolioSimulator<C>,
}

impl<C: CostModel> SimulatedPortfolio<C> {
    pub fn new(sizer: PositionSizer, simulator: PortfolioSimulator<C>) -> Self {
        SimulatedPortfolio { sizer, simulator }
    }
}

impl<C: CostModel> Portfolio for SimulatedPortfolio<C> {
    fn generate_positions(
        &self,
        signals: &SignalFrame,
        prices: &PriceFrame,
        initial_cash: f64,
    ) -> Result<Vec<Position>, SigfolioError> {
        self.sizer.generate_positions(signals, prices, initial_cash)
    }

    fn backtest_portfolio(
        &self,
        positions: &[Position],
        prices: &PriceFrame,
        initial_cash: f64,
    ) -> Result<Vec<PortfolioState>, SigfolioError> {
        self.simulator.backtest_portfolio(positions, prices, initial_cash)
    }
}
