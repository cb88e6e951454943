//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::SigfolioError;
use crate::domain::portfolio::Shortfall;
use crate::ports::config_port::{parse_bool, ConfigPort};

/// Which signal source a config selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Signals,
    MovingAverageCross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    FixedFraction,
    FixedQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Number,
    Integer,
    Bool,
}

/// Keys read through the typed getters, which fall back to their default on
/// a parse failure. Each must parse when present.
const TYPED_KEYS: &[(&str, &str, ValueKind)] = &[
    ("backtest", "initial_cash", ValueKind::Number),
    ("backtest", "periods_per_year", ValueKind::Number),
    ("backtest", "risk_free_rate", ValueKind::Number),
    ("sizing", "fraction", ValueKind::Number),
    ("sizing", "quantity", ValueKind::Number),
    ("sizing", "whole_units", ValueKind::Bool),
    ("sizing", "allow_shorting", ValueKind::Bool),
    ("execution", "commission_per_trade", ValueKind::Number),
    ("execution", "commission_pct", ValueKind::Number),
    ("execution", "slippage_pct", ValueKind::Number),
    ("strategy", "short_window", ValueKind::Integer),
    ("strategy", "long_window", ValueKind::Integer),
];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    validate_value_types(config)?;
    validate_initial_cash(config)?;
    validate_periods_per_year(config)?;
    validate_risk_free_rate(config)?;
    validate_sizing(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    cash_floor(config)?;
    shortfall(config)?;
    validate_strategy(config)?;
    Ok(())
}

fn invalid(key: &str, reason: &str) -> SigfolioError {
    SigfolioError::Configuration {
        parameter: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_value_types(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    for &(section, key, kind) in TYPED_KEYS {
        let Some(raw) = config.get_string(section, key) else {
            continue;
        };
        let raw = raw.trim();
        let (parses, expected) = match kind {
            ValueKind::Number => (
                raw.parse::<f64>().is_ok_and(|v| v.is_finite()),
                "a finite number",
            ),
            ValueKind::Integer => (raw.parse::<i64>().is_ok(), "an integer"),
            ValueKind::Bool => (parse_bool(raw).is_some(), "true or false"),
        };
        if !parses {
            return Err(invalid(key, &format!("{key} must be {expected}, got '{raw}'")));
        }
    }
    Ok(())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    if !config.has_key("backtest", "initial_cash") {
        return Err(SigfolioError::ConfigMissing {
            section: "backtest".to_string(),
            key: "initial_cash".to_string(),
        });
    }
    let value = config.get_double("backtest", "initial_cash", 0.0);
    if value <= 0.0 {
        return Err(invalid("initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    let value = config.get_double("backtest", "periods_per_year", 252.0);
    if value <= 0.0 {
        return Err(invalid("periods_per_year", "periods_per_year must be positive"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid("risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }
    Ok(())
}

/// Sizing policy named by `[sizing] policy`, defaulting to fixed fraction.
pub fn policy_kind(config: &dyn ConfigPort) -> Result<PolicyKind, SigfolioError> {
    match config
        .get_string("sizing", "policy")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("fixed_fraction") => Ok(PolicyKind::FixedFraction),
        Some("fixed_quantity") => Ok(PolicyKind::FixedQuantity),
        Some(_) => Err(invalid(
            "policy",
            "policy must be fixed_fraction or fixed_quantity",
        )),
    }
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    match policy_kind(config)? {
        PolicyKind::FixedFraction => {
            let value = config.get_double("sizing", "fraction", 0.1);
            if value <= 0.0 || value > 1.0 {
                return Err(invalid("fraction", "fraction must be between 0 and 1"));
            }
        }
        PolicyKind::FixedQuantity => {
            let value = config.get_double("sizing", "quantity", 1.0);
            if value <= 0.0 {
                return Err(invalid("quantity", "quantity must be positive"));
            }
        }
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    if config.get_double("execution", "commission_per_trade", 0.0) < 0.0 {
        return Err(invalid(
            "commission_per_trade",
            "commission_per_trade must be non-negative",
        ));
    }
    if config.get_double("execution", "commission_pct", 0.0) < 0.0 {
        return Err(invalid("commission_pct", "commission_pct must be non-negative"));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    let value = config.get_double("execution", "slippage_pct", 0.0);
    if !(0.0..100.0).contains(&value) {
        return Err(invalid("slippage_pct", "slippage_pct must be between 0 and 100"));
    }
    Ok(())
}

/// `[execution] cash_floor`: a number, or `none` for unconstrained cash.
/// Defaults to zero.
pub fn cash_floor(config: &dyn ConfigPort) -> Result<Option<f64>, SigfolioError> {
    match config.get_string("execution", "cash_floor") {
        None => Ok(Some(0.0)),
        Some(s) if s.trim().eq_ignore_ascii_case("none") => Ok(None),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid("cash_floor", "cash_floor must be a number or none")),
    }
}

pub fn shortfall(config: &dyn ConfigPort) -> Result<Shortfall, SigfolioError> {
    match config
        .get_string("execution", "shortfall")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("clip") => Ok(Shortfall::Clip),
        Some("reject") => Ok(Shortfall::Reject),
        Some(_) => Err(invalid("shortfall", "shortfall must be clip or reject")),
    }
}

pub fn strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, SigfolioError> {
    match config
        .get_string("strategy", "kind")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("signals") => Ok(StrategyKind::Signals),
        Some("ma_cross") => Ok(StrategyKind::MovingAverageCross),
        Some(_) => Err(invalid("kind", "kind must be signals or ma_cross")),
    }
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), SigfolioError> {
    if strategy_kind(config)? == StrategyKind::MovingAverageCross {
        let short = config.get_int("strategy", "short_window", 20);
        let long = config.get_int("strategy", "long_window", 50);
        if short < 1 {
            return Err(invalid("short_window", "short_window must be at least 1"));
        }
        if long <= short {
            return Err(invalid(
                "long_window",
                "long_window must be greater than short_window",
            ));
        }
    }
    Ok(())
}
