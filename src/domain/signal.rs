//! Trading signals and the validated signal frame.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::SigfolioError;

/// Discrete trading direction: long, hold (flat) or short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Short,
    Hold,
    Long,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Short => -1.0,
            Direction::Hold => 0.0,
            Direction::Long => 1.0,
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = SigfolioError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Short),
            0 => Ok(Direction::Hold),
            1 => Ok(Direction::Long),
            other => Err(SigfolioError::Data {
                reason: format!("signal value must be -1, 0 or 1, got {other}"),
            }),
        }
    }
}

impl From<Direction> for i64 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Short => -1,
            Direction::Hold => 0,
            Direction::Long => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub date: NaiveDate,
    pub instrument: String,
    pub direction: Direction,
}

impl Signal {
    pub fn new(date: NaiveDate, instrument: &str, direction: Direction) -> Self {
        Signal {
            date,
            instrument: instrument.to_string(),
            direction,
        }
    }
}

/// Signals grouped by date, then by instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalFrame {
    rows: BTreeMap<NaiveDate, BTreeMap<String, Direction>>,
}

impl SignalFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from a date-ordered signal sequence.
    ///
    /// Rejects sequences that go backwards in time or repeat an
    /// (date, instrument) pair.
    pub fn from_signals(signals: &[Signal]) -> Result<Self, SigfolioError> {
        let mut frame = SignalFrame::new();
        let mut last_date: Option<NaiveDate> = None;

        for signal in signals {
            if let Some(prev) = last_date {
                if signal.date < prev {
                    return Err(SigfolioError::alignment(format!(
                        "signals out of order: {} follows {}",
                        signal.date, prev
                    )));
                }
            }
            last_date = Some(signal.date);
            frame.insert(signal.clone())?;
        }

        Ok(frame)
    }

    /// Insert a single signal, rejecting duplicates.
    pub fn insert(&mut self, signal: Signal) -> Result<(), SigfolioError> {
        let row = self.rows.entry(signal.date).or_default();
        if row.contains_key(&signal.instrument) {
            return Err(SigfolioError::alignment(format!(
                "duplicate signal for {} on {}",
                signal.instrument, signal.date
            )));
        }
        row.insert(signal.instrument, signal.direction);
        Ok(())
    }

    pub fn get(&self, date: NaiveDate, instrument: &str) -> Option<Direction> {
        self.rows.get(&date).and_then(|row| row.get(instrument)).copied()
    }

    pub fn row(&self, date: NaiveDate) -> Option<&BTreeMap<String, Direction>> {
        self.rows.get(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &BTreeMap<String, Direction>)> {
        self.rows.iter().map(|(d, row)| (*d, row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flatten back into an ordered signal sequence.
    pub fn to_signals(&self) -> Vec<Signal> {
        self.rows
            .iter()
            .flat_map(|(date, row)| {
                row.iter()
                    .map(move |(instrument, &direction)| Signal::new(*date, instrument, direction))
            })
            .collect()
    }
}
