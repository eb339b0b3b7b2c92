//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod regime;
pub mod confirmation;
pub mod position;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod cache;
pub mod config_validation;
pub mod error;
