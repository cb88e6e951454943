//! Core domain types and the backtest pipeline.

pub mod signal;
pub mod price;
pub mod position;
pub mod sizing;
pub mod cost;
pub mod portfolio;
pub mod metrics;
pub mod strategy;
pub mod backtest;
pub mod config_validation;
pub mod error;
