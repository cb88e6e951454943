//! Target positions emitted by the sizer.

use chrono::NaiveDate;

/// Target quantity of an instrument to hold at a given date.
///
/// Positive quantities are long, negative are short.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub date: NaiveDate,
    pub instrument: String,
    pub quantity: f64,
}

impl Position {
    pub fn new(date: NaiveDate, instrument: &str, quantity: f64) -> Self {
        Position {
            date,
            instrument: instrument.to_string(),
            quantity,
        }
    }
}
