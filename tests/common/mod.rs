#![allow(dead_code)]

use chrono::NaiveDate;
use sigfolio::domain::backtest::BacktestResult;
use sigfolio::domain::error::SigfolioError;
use sigfolio::domain::price::PriceFrame;
use sigfolio::domain::signal::{Direction, Signal};
use sigfolio::ports::data_port::DataPort;
use sigfolio::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting 2024-01-01.
pub fn day(n: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(n as i64)
}

pub fn price_frame(rows: &[(usize, &str, f64)]) -> PriceFrame {
    let mut frame = PriceFrame::new();
    for &(n, code, price) in rows {
        frame.insert(day(n), code, price).unwrap();
    }
    frame
}

pub fn signals(rows: &[(usize, &str, i64)]) -> Vec<Signal> {
    rows.iter()
        .map(|&(n, code, value)| Signal::new(day(n), code, Direction::try_from(value).unwrap()))
        .collect()
}

/// Single-instrument prices on consecutive days.
pub fn series(code: &str, closes: &[f64]) -> PriceFrame {
    let rows: Vec<(usize, &str, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &p)| (i, code, p))
        .collect();
    price_frame(&rows)
}

pub struct MockDataPort {
    pub prices: PriceFrame,
    pub signals: Vec<Signal>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(prices: PriceFrame, signals: Vec<Signal>) -> Self {
        Self {
            prices,
            signals,
            error: None,
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_prices(&self) -> Result<PriceFrame, SigfolioError> {
        if let Some(reason) = &self.error {
            return Err(SigfolioError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.prices.clone())
    }

    fn load_signals(&self) -> Result<Vec<Signal>, SigfolioError> {
        Ok(self.signals.clone())
    }
}

/// Records how many reports were written and the final equity of each.
#[derive(Default)]
pub struct RecordingReportPort {
    pub written: RefCell<Vec<(PathBuf, f64)>>,
}

impl ReportPort for RecordingReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SigfolioError> {
        self.written
            .borrow_mut()
            .push((output_path.to_path_buf(), result.report.final_equity));
        Ok(())
    }
}

pub fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn assert_equity_invariant(result: &BacktestResult, prices: &PriceFrame) {
    for state in &result.states {
        let Some(d) = state.date else { continue };
        let marked: f64 = state
            .holdings
            .iter()
            .map(|(code, qty)| qty * prices.get(d, code).unwrap())
            .sum();
        let expected = state.cash + marked;
        let tolerance = 1e-6 * expected.abs().max(1.0);
        assert!(
            (state.total_equity - expected).abs() <= tolerance,
            "equity mismatch on {d}: {} vs {}",
            state.total_equity,
            expected
        );
    }
}
