//! Position sizing: turns signals and available cash into target quantities.
//!
//! The sizer walks the signal frame forward in time, keeping a running
//! notional cash balance so that each target only depends on signals and
//! prices at or before its own date.

use std::collections::BTreeMap;

use tracing::debug;

use super::error::SigfolioError;
use super::position::Position;
use super::price::PriceFrame;
use super::signal::{Direction, SignalFrame};

/// Absorbs representation error before flooring to whole units.
const WHOLE_UNIT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingPolicy {
    /// Commit `fraction` of available cash to each new signal.
    FixedFraction { fraction: f64 },
    /// Hold a constant number of units per signal.
    FixedQuantity { quantity: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub policy: SizingPolicy,
    pub whole_units: bool,
    pub allow_shorting: bool,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            policy: SizingPolicy::FixedFraction { fraction: 0.1 },
            whole_units: true,
            allow_shorting: true,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), SigfolioError> {
        match self.policy {
            SizingPolicy::FixedFraction { fraction } => {
                if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
                    return Err(SigfolioError::configuration(
                        "fraction",
                        format!("fraction must be in (0, 1], got {fraction}"),
                    ));
                }
            }
            SizingPolicy::FixedQuantity { quantity } => {
                if !quantity.is_finite() || quantity <= 0.0 {
                    return Err(SigfolioError::configuration(
                        "quantity",
                        format!("quantity must be positive, got {quantity}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_initial_cash(initial_cash: f64) -> Result<(), SigfolioError> {
    if !initial_cash.is_finite() || initial_cash <= 0.0 {
        return Err(SigfolioError::configuration(
            "initial_cash",
            format!("initial_cash must be positive, got {initial_cash}"),
        ));
    }
    Ok(())
}

/// Check that signals and prices cover the same dates and that every
/// signalled instrument is priced on the day of its signal.
pub fn check_alignment(signals: &SignalFrame, prices: &PriceFrame) -> Result<(), SigfolioError> {
    if let Some(date) = signals.dates().find(|d| !prices.contains_date(*d)) {
        return Err(SigfolioError::alignment(format!(
            "signal date {date} has no prices"
        )));
    }
    if let Some(date) = prices.dates().find(|d| signals.row(*d).is_none()) {
        return Err(SigfolioError::alignment(format!(
            "price date {date} has no signals"
        )));
    }
    for (date, row) in signals.iter() {
        for instrument in row.keys() {
            if prices.get(date, instrument).is_none() {
                return Err(SigfolioError::alignment(format!(
                    "no price for {instrument} on {date}"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Result<Self, SigfolioError> {
        config.validate()?;
        Ok(PositionSizer { config })
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Target quantity for one instrument given its current signal, the cash
    /// available to it and its current price.
    pub fn target_quantity(&self, direction: Direction, cash: f64, price: f64) -> f64 {
        let sign = match direction {
            Direction::Short if !self.config.allow_shorting => 0.0,
            d => d.sign(),
        };
        if sign == 0.0 {
            return 0.0;
        }

        let magnitude = match self.config.policy {
            SizingPolicy::FixedFraction { fraction } => fraction * cash.max(0.0) / price,
            SizingPolicy::FixedQuantity { quantity } => quantity,
        };
        let magnitude = if self.config.whole_units {
            (magnitude + WHOLE_UNIT_TOLERANCE).floor()
        } else {
            magnitude
        };

        if magnitude == 0.0 { 0.0 } else { sign * magnitude }
    }

    /// Produce target positions for every date in the signal frame.
    ///
    /// A repeated signal keeps the previous target, and an instrument without
    /// a signal on a date keeps its last target. Every instrument that has
    /// been signalled so far gets a position on each subsequent date.
    ///
    /// The running cash balance is notional: it moves by `quantity * price`
    /// only and ignores transaction costs, slippage and fills the simulator
    /// later clips. After a clip, later targets may be sized from cash the
    /// simulator does not hold, and will be clipped again in turn.
    pub fn generate_positions(
        &self,
        signals: &SignalFrame,
        prices: &PriceFrame,
        initial_cash: f64,
    ) -> Result<Vec<Position>, SigfolioError> {
        self.config.validate()?;
        validate_initial_cash(initial_cash)?;
        check_alignment(signals, prices)?;

        let mut cash = initial_cash;
        let mut targets: BTreeMap<String, f64> = BTreeMap::new();
        let mut last_signal: BTreeMap<String, Direction> = BTreeMap::new();
        let mut positions = Vec::new();

        for (date, row) in signals.iter() {
            for (instrument, &direction) in row {
                if last_signal.get(instrument) == Some(&direction) {
                    continue;
                }
                let price = prices.get(date, instrument).ok_or_else(|| {
                    SigfolioError::alignment(format!("no price for {instrument} on {date}"))
                })?;

                let held = targets.get(instrument).copied().unwrap_or(0.0);
                let free_cash = cash + held * price;
                let target = self.target_quantity(direction, free_cash, price);
                cash -= (target - held) * price;

                debug!(
                    %date,
                    instrument = %instrument,
                    ?direction,
                    held,
                    target,
                    "resized position"
                );
                targets.insert(instrument.clone(), target);
                last_signal.insert(instrument.clone(), direction);
            }

            positions.extend(
                targets
                    .iter()
                    .map(|(instrument, &quantity)| Position::new(date, instrument, quantity)),
            );
        }

        Ok(positions)
    }
}
