//! Backtest runner — merges every instrument into one chronological stream
//! and drives the core ledger through it.
//!
//! For each date in the union of all series dates:
//!
//! 1. Exit phase: every symbol with a bar on that date, in lexical order, has
//!    its open position evaluated and any exit realised. A position still open
//!    on the last bar of its series is closed at the close with `END_OF_DATA`.
//! 2. Entry phase: same order, bars flagged `entry_signal` open a new position
//!    at the close, stopped at the initial stop.
//!
//! One `AccountState` and one ledger are shared across instruments, so sizing
//! always sees the equity left by every earlier exit.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use chrono::NaiveDate;
use swinglab_core::stops::initial_stop;
use swinglab_core::{
    AccountState, Bar, EngineError, ExitEvaluator, ExitKind, ExitOrder, PositionLedger,
    TradeRecord,
};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::metrics::LedgerSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("bars for {symbol} are not in strictly increasing date order at {date}")]
    UnsortedSeries { symbol: String, date: NaiveDate },
    #[error("series '{key}' contains a bar for '{symbol}'")]
    SymbolMismatch { key: String, symbol: String },
}

/// Why an entry signal did not become a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidStop,
    ZeroSize,
    MissingIndicator,
    DepletedEquity,
    /// Signal on the final bar of the series; nothing left to manage.
    LastBar,
}

impl SkipReason {
    /// Skip reason for a recoverable engine error; `None` aborts the run.
    pub fn from_engine_error(err: &EngineError) -> Option<Self> {
        match err {
            EngineError::InvalidStop { .. } => Some(SkipReason::InvalidStop),
            EngineError::ZeroSize { .. } => Some(SkipReason::ZeroSize),
            EngineError::MissingIndicator { .. } => Some(SkipReason::MissingIndicator),
            EngineError::DepletedEquity { .. } => Some(SkipReason::DepletedEquity),
            EngineError::UnsupportedStrategy(_)
            | EngineError::DuplicatePosition(_)
            | EngineError::UnknownPosition(_)
            | EngineError::InvalidConfig(_) => None,
        }
    }
}

/// An entry signal that was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: SkipReason,
    pub detail: String,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub stop_strategy: String,
    pub config: BacktestConfig,
    pub summary: LedgerSummary,
    pub trades: Vec<TradeRecord>,
    pub skipped_entries: Vec<SkippedEntry>,
    pub starting_equity: f64,
    pub final_equity: f64,
    /// Equity after each realised exit, starting with the opening balance.
    pub equity_curve: Vec<f64>,
    pub bar_count: usize,
    /// True if new entries were halted because equity ran out.
    pub entries_halted: bool,
}

/// Run one backtest over per-symbol bar series.
///
/// Configuration is validated before the first bar. Per-entry failures are
/// recorded as [`SkippedEntry`]; ledger misuse aborts the run.
pub fn run_backtest(
    config: &BacktestConfig,
    data: &BTreeMap<String, Vec<Bar>>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let evaluator = config.evaluator()?;
    validate_series(data)?;

    let run_id = config.run_id()?;
    let strategy = evaluator.strategy().kind();
    info!(
        run_id = %run_id,
        strategy = strategy.name(),
        symbols = data.len(),
        "backtest started"
    );

    let mut sim = Simulation {
        config,
        evaluator: &evaluator,
        account: AccountState::new(config.account_value),
        ledger: PositionLedger::new(config.sizer()?, strategy),
        skipped: Vec::new(),
        entries_halted: false,
    };

    let dates: BTreeSet<NaiveDate> = data.values().flatten().map(|b| b.date).collect();
    let mut cursors: BTreeMap<&str, usize> = data.keys().map(|k| (k.as_str(), 0)).collect();

    for date in &dates {
        // Symbols with a bar on this date, and that bar's index.
        let mut today: Vec<(&str, usize)> = Vec::new();
        for (symbol, series) in data {
            let cursor = cursors.entry(symbol.as_str()).or_insert(0);
            if series.get(*cursor).is_some_and(|b| b.date == *date) {
                today.push((symbol.as_str(), *cursor));
                *cursor += 1;
            }
        }

        for &(symbol, index) in &today {
            sim.exit_phase(symbol, &data[symbol], index)?;
        }
        for &(symbol, index) in &today {
            sim.entry_phase(symbol, &data[symbol], index)?;
        }
    }

    let Simulation {
        account,
        ledger,
        skipped,
        entries_halted,
        ..
    } = sim;
    let trades = ledger.into_trades();
    let summary = LedgerSummary::compute(&trades, account.starting_equity());

    info!(
        run_id = %run_id,
        trades = trades.len(),
        skipped = skipped.len(),
        final_equity = account.current_equity(),
        "backtest finished"
    );

    Ok(BacktestResult {
        run_id,
        stop_strategy: strategy.name().to_string(),
        config: config.clone(),
        summary,
        trades,
        skipped_entries: skipped,
        starting_equity: account.starting_equity(),
        final_equity: account.current_equity(),
        equity_curve: account.equity_history().to_vec(),
        bar_count: data.values().map(Vec::len).sum(),
        entries_halted,
    })
}

/// Mutable state of one run.
struct Simulation<'a> {
    config: &'a BacktestConfig,
    evaluator: &'a ExitEvaluator,
    account: AccountState,
    ledger: PositionLedger,
    skipped: Vec<SkippedEntry>,
    entries_halted: bool,
}

impl Simulation<'_> {
    fn exit_phase(&mut self, symbol: &str, series: &[Bar], index: usize) -> Result<(), RunError> {
        if !self.ledger.is_open(symbol) {
            return Ok(());
        }
        let bar = &series[index];
        let history = &series[..=index];
        let decision =
            self.ledger
                .update(self.evaluator, symbol, history, bar.exit_signal.as_deref())?;
        if let Some(order) = ExitOrder::from_decision(&decision, bar, index) {
            self.ledger.close(&mut self.account, symbol, order)?;
        }

        if index + 1 == series.len() && self.ledger.is_open(symbol) {
            let order = ExitOrder::full(ExitKind::EndOfData, bar.close, bar.date, index);
            self.ledger.close(&mut self.account, symbol, order)?;
        }
        Ok(())
    }

    fn entry_phase(&mut self, symbol: &str, series: &[Bar], index: usize) -> Result<(), RunError> {
        let bar = &series[index];
        if !bar.entry_signal {
            return Ok(());
        }
        if self.ledger.is_open(symbol) {
            debug!(symbol = %symbol, date = %bar.date, "entry signal ignored, position open");
            return Ok(());
        }
        if self.entries_halted {
            self.skip(bar, SkipReason::DepletedEquity, "entries halted".into());
            return Ok(());
        }
        if index + 1 == series.len() {
            self.skip(bar, SkipReason::LastBar, "signal on final bar".into());
            return Ok(());
        }

        let attempt = initial_stop(bar, &self.config.initial_stop).and_then(|stop| {
            self.ledger
                .open(symbol, bar.date, bar.close, stop, index, &self.account)
                .map(|_| ())
        });

        match attempt {
            Ok(()) => Ok(()),
            Err(err) => {
                let Some(reason) = SkipReason::from_engine_error(&err) else {
                    return Err(err.into());
                };
                if reason == SkipReason::DepletedEquity {
                    self.entries_halted = true;
                    warn!(
                        date = %bar.date,
                        equity = self.account.current_equity(),
                        "equity depleted, halting new entries"
                    );
                }
                self.skip(bar, reason, err.to_string());
                Ok(())
            }
        }
    }

    fn skip(&mut self, bar: &Bar, reason: SkipReason, detail: String) {
        warn!(symbol = %bar.symbol, date = %bar.date, ?reason, %detail, "entry skipped");
        self.skipped.push(SkippedEntry {
            symbol: bar.symbol.clone(),
            date: bar.date,
            reason,
            detail,
        });
    }
}

/// Every series must hold only its own symbol, in strictly increasing date order.
fn validate_series(data: &BTreeMap<String, Vec<Bar>>) -> Result<(), RunError> {
    for (key, series) in data {
        if let Some(bar) = series.iter().find(|b| &b.symbol != key) {
            return Err(RunError::SymbolMismatch {
                key: key.clone(),
                symbol: bar.symbol.clone(),
            });
        }
        if let Some(pair) = series.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(RunError::UnsortedSeries {
                symbol: key.clone(),
                date: pair[1].date,
            });
        }
    }
    Ok(())
}
