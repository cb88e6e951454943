//! Performance statistics derived from the equity curve.
//!
//! Volatility uses the population standard deviation (divide by n)
//! throughout. Ratios with a zero denominator are reported as NaN.

use super::error::SigfolioError;
use super::portfolio::PortfolioState;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub periods_per_year: f64,
    /// Annual rate, converted to a per-period rate before use.
    pub risk_free_rate: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            periods_per_year: TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), SigfolioError> {
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(SigfolioError::configuration(
                "periods_per_year",
                "periods_per_year must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.risk_free_rate) {
            return Err(SigfolioError::configuration(
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    /// One entry per state after the first.
    pub returns: Vec<f64>,
    pub cumulative_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of consecutive periods spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub final_equity: f64,
}

impl PerformanceReport {
    pub fn summarize(
        states: &[PortfolioState],
        config: &ReportConfig,
    ) -> Result<Self, SigfolioError> {
        config.validate()?;

        let equity: Vec<f64> = states.iter().map(|s| s.total_equity).collect();
        let returns = period_returns(&equity);

        let cumulative_return = match (equity.first(), equity.last()) {
            (Some(&first), Some(&last)) if equity.len() > 1 && first != 0.0 => last / first - 1.0,
            _ => 0.0,
        };

        let annualized_return = if !returns.is_empty() && cumulative_return > -1.0 {
            let years = returns.len() as f64 / config.periods_per_year;
            (1.0 + cumulative_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&equity);
        let period_rf = config.risk_free_rate / config.periods_per_year;
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(&returns, period_rf, config.periods_per_year);

        Ok(PerformanceReport {
            returns,
            cumulative_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
            final_equity: equity.last().copied().unwrap_or(0.0),
        })
    }
}

/// `equity[t] / equity[t-1] - 1`; a zero prior equity yields a zero return.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn compute_drawdown(equity: &[f64]) -> (f64, usize) {
    let Some(&first) = equity.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for &value in equity {
        if value >= peak {
            peak = value;
            current_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(returns: &[f64], period_rf: f64, periods_per_year: f64) -> (f64, f64) {
    if returns.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let excess_return = mean - period_rf;
    let annualizer = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        excess_return / stddev * annualizer
    } else {
        f64::NAN
    };

    let downside_variance = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        excess_return / downside_stddev * annualizer
    } else {
        f64::NAN
    };

    (sharpe, sortino)
}
