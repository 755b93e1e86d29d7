//! SwingLab Runner — backtest orchestration on top of `swinglab-core`.
//!
//! This crate provides:
//! - TOML configuration with validation and a content-hash run id
//! - JSON bar loading
//! - The chronological multi-instrument backtest loop
//! - Ledger summary metrics
//! - Parallel stop strategy comparison

pub mod compare;
pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;

pub use compare::{all_strategy_tags, compare_stop_strategies, StrategyComparison};
pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{load_bars, parse_bars, BarsBySymbol, LoadError};
pub use metrics::LedgerSummary;
pub use runner::{run_backtest, BacktestResult, RunError, SkipReason, SkippedEntry};
