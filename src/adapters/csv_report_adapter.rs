//! CSV report adapter: equity curve plus a key/value summary.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SigfolioError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct EquityRow {
    date: String,
    cash: f64,
    holdings_value: f64,
    equity: f64,
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    /// `equity.csv` → `equity_summary.csv`, alongside the curve.
    pub fn summary_path(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        output_path.with_file_name(format!("{stem}_summary.csv"))
    }

    fn write_curve(result: &BacktestResult, path: &Path) -> Result<(), SigfolioError> {
        let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
        for state in &result.states {
            wtr.serialize(EquityRow {
                date: state.date.map(|d| d.to_string()).unwrap_or_default(),
                cash: state.cash,
                holdings_value: state.holdings_value(),
                equity: state.total_equity,
            })
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(result: &BacktestResult, path: &Path) -> Result<(), SigfolioError> {
        let report = &result.report;
        let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
        wtr.write_record(["metric", "value"]).map_err(csv_error)?;
        let rows = [
            ("final_equity", report.final_equity.to_string()),
            ("cumulative_return", report.cumulative_return.to_string()),
            ("annualized_return", report.annualized_return.to_string()),
            ("max_drawdown", report.max_drawdown.to_string()),
            ("max_drawdown_duration", report.max_drawdown_duration.to_string()),
            ("sharpe_ratio", report.sharpe_ratio.to_string()),
            ("sortino_ratio", report.sortino_ratio.to_string()),
            ("periods", report.returns.len().to_string()),
        ];
        for (metric, value) in &rows {
            wtr.write_record([*metric, value.as_str()]).map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> SigfolioError {
    SigfolioError::Data {
        reason: format!("CSV write error: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SigfolioError> {
        Self::write_curve(result, output_path)?;
        Self::write_summary(result, &Self::summary_path(output_path))
    }
}
