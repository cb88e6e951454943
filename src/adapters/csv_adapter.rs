//! CSV file data adapter.
//!
//! Both files are in long format, one row per (date, instrument):
//! `date,instrument,price` and `date,instrument,signal`.

use crate::domain::error::SigfolioError;
use crate::domain::price::PriceFrame;
use crate::domain::signal::{Direction, Signal};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct PriceRecord {
    date: String,
    instrument: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct SignalRecord {
    date: String,
    instrument: String,
    signal: i64,
}

pub struct CsvAdapter {
    prices_path: PathBuf,
    signals_path: Option<PathBuf>,
}

impl CsvAdapter {
    pub fn new(prices_path: PathBuf, signals_path: Option<PathBuf>) -> Self {
        Self {
            prices_path,
            signals_path,
        }
    }

    fn reader(path: &Path) -> Result<csv::Reader<File>, SigfolioError> {
        let file = File::open(path).map_err(|e| SigfolioError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
    }
}

fn parse_date(value: &str, line: usize) -> Result<NaiveDate, SigfolioError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| SigfolioError::Data {
        reason: format!("invalid date '{value}' on line {line}: {e}"),
    })
}

fn record_line(record: &csv::StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(0)
}

impl DataPort for CsvAdapter {
    fn load_prices(&self) -> Result<PriceFrame, SigfolioError> {
        let mut rdr = Self::reader(&self.prices_path)?;
        let headers = rdr
            .headers()
            .map_err(|e| SigfolioError::Data {
                reason: format!("CSV parse error: {e}"),
            })?
            .clone();
        let mut prices = PriceFrame::new();

        for result in rdr.records() {
            let raw = result.map_err(|e| SigfolioError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;
            let line = record_line(&raw);
            let record: PriceRecord =
                raw.deserialize(Some(&headers)).map_err(|e| SigfolioError::Data {
                    reason: format!("invalid price row on line {line}: {e}"),
                })?;
            let date = parse_date(&record.date, line)?;
            prices.insert(date, &record.instrument, record.price)?;
        }

        Ok(prices)
    }

    fn load_signals(&self) -> Result<Vec<Signal>, SigfolioError> {
        let path = self.signals_path.as_ref().ok_or_else(|| SigfolioError::Data {
            reason: "no signals file configured".into(),
        })?;
        let mut rdr = Self::reader(path)?;
        let headers = rdr
            .headers()
            .map_err(|e| SigfolioError::Data {
                reason: format!("CSV parse error: {e}"),
            })?
            .clone();
        let mut signals = Vec::new();

        for result in rdr.records() {
            let raw = result.map_err(|e| SigfolioError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;
            let line = record_line(&raw);
            let record: SignalRecord =
                raw.deserialize(Some(&headers)).map_err(|e| SigfolioError::Data {
                    reason: format!("invalid signal row on line {line}: {e}"),
                })?;
            signals.push(Signal {
                date: parse_date(&record.date, line)?,
                instrument: record.instrument,
                direction: Direction::try_from(record.signal)?,
            });
        }

        Ok(signals)
    }
}
