//! Data access port trait: the loader supplying prices and signals.

use crate::domain::error::SigfolioError;
use crate::domain::price::PriceFrame;
use crate::domain::signal::Signal;

pub trait DataPort {
    fn load_prices(&self) -> Result<PriceFrame, SigfolioError>;

    /// Signals in file order; ordering and duplicates are checked when the
    /// sequence is turned into a frame.
    fn load_signals(&self) -> Result<Vec<Signal>, SigfolioError>;
}
