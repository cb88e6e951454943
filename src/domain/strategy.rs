//! Signal sources.

use super::error::SigfolioError;
use super::price::PriceFrame;
use super::signal::{Direction, Signal, SignalFrame};

/// Produces a date-ordered signal frame for the instruments in `prices`.
pub trait Strategy {
    fn name(&self) -> &str;

    fn generate_signals(&self, prices: &PriceFrame) -> Result<SignalFrame, SigfolioError>;
}

/// Pre-computed signals, typically loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    frame: SignalFrame,
}

impl SignalTable {
    pub fn new(frame: SignalFrame) -> Self {
        SignalTable { frame }
    }

    pub fn from_signals(signals: &[Signal]) -> Result<Self, SigfolioError> {
        Ok(SignalTable {
            frame: SignalFrame::from_signals(signals)?,
        })
    }
}

impl Strategy for SignalTable {
    fn name(&self) -> &str {
        "signal table"
    }

    fn generate_signals(&self, _prices: &PriceFrame) -> Result<SignalFrame, SigfolioError> {
        Ok(self.frame.clone())
    }
}

/// Long while the short simple moving average is above the long one, flat
/// otherwise. Instruments hold until `long_window` prices have been seen.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageCross {
    short_window: usize,
    long_window: usize,
}

impl MovingAverageCross {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, SigfolioError> {
        check_windows(short_window, long_window)?;
        Ok(MovingAverageCross {
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }
}

fn check_windows(short_window: usize, long_window: usize) -> Result<(), SigfolioError> {
    if short_window == 0 {
        return Err(SigfolioError::configuration(
            "short_window",
            "short_window must be at least 1",
        ));
    }
    if long_window <= short_window {
        return Err(SigfolioError::configuration(
            "long_window",
            "long_window must be greater than short_window",
        ));
    }
    Ok(())
}

fn trailing_mean(values: &[f64], end: usize, window: usize) -> f64 {
    let slice = &values[end + 1 - window..=end];
    slice.iter().sum::<f64>() / window as f64
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> &str {
        "moving average cross"
    }

    fn generate_signals(&self, prices: &PriceFrame) -> Result<SignalFrame, SigfolioError> {
        check_windows(self.short_window, self.long_window)?;
        let mut frame = SignalFrame::new();

        for instrument in prices.instruments() {
            let series = prices.series(&instrument);
            let closes: Vec<f64> = series.iter().map(|&(_, p)| p).collect();

            for (i, &(date, _)) in series.iter().enumerate() {
                let direction = if i + 1 < self.long_window {
                    Direction::Hold
                } else if trailing_mean(&closes, i, self.short_window)
                    > trailing_mean(&closes, i, self.long_window)
                {
                    Direction::Long
                } else {
                    Direction::Hold
                };
                frame.insert(Signal::new(date, &instrument, direction))?;
            }
        }

        Ok(frame)
    }
}
