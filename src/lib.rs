//! sigfolio: signal-driven portfolio backtester.
//!
//! Hexagonal architecture: the signal → position → equity pipeline lives in
//! [`domain`], collaborator boundaries are traits in [`ports`], and file-based
//! implementations are in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
