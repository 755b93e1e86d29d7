//! Ledger summary — pure functions over the realised trade list.
//!
//! A position closed in several legs appears once per leg in the ledger.
//! Round-trip statistics (win rate, R) use the final leg of each position,
//! whose `r_multiple` already blends the earlier partials. Dollar statistics
//! use every leg.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use swinglab_core::TradeRecord;

/// Cap for profit factor when there are no losing legs.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

/// Aggregate statistics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Closed positions (final legs).
    pub round_trips: usize,
    /// All ledger records, partial legs included.
    pub record_count: usize,
    pub win_rate: f64,
    pub avg_r: f64,
    pub total_r: f64,
    /// Mean dollar P&L per round trip.
    pub expectancy: f64,
    pub profit_factor: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    /// Worst peak-to-trough equity decline, in percent (<= 0).
    pub max_drawdown_pct: f64,
    pub avg_bars_held: f64,
    /// Record count per exit label.
    pub exits_by_kind: BTreeMap<String, usize>,
}

impl LedgerSummary {
    pub fn compute(trades: &[TradeRecord], starting_equity: f64) -> Self {
        let finals: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_final()).collect();
        let curve = equity_curve(trades, starting_equity);
        let total = total_pnl(trades);
        Self {
            round_trips: finals.len(),
            record_count: trades.len(),
            win_rate: win_rate(&finals),
            avg_r: mean_r(&finals),
            total_r: finals.iter().map(|t| t.r_multiple).sum(),
            expectancy: if finals.is_empty() {
                0.0
            } else {
                total / finals.len() as f64
            },
            profit_factor: profit_factor(trades),
            total_pnl: total,
            total_return_pct: if starting_equity > 0.0 {
                total / starting_equity * 100.0
            } else {
                0.0
            },
            max_drawdown_pct: max_drawdown_pct(&curve),
            avg_bars_held: if finals.is_empty() {
                0.0
            } else {
                finals.iter().map(|t| t.bars_held as f64).sum::<f64>() / finals.len() as f64
            },
            exits_by_kind: exits_by_kind(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Trade-level equity curve: starting equity, then equity after each record.
pub fn equity_curve(trades: &[TradeRecord], starting_equity: f64) -> Vec<f64> {
    std::iter::once(starting_equity)
        .chain(trades.iter().map(|t| t.equity_after_trade))
        .collect()
}

pub fn total_pnl(trades: &[TradeRecord]) -> f64 {
    trades.iter().map(|t| t.dollar_pnl).sum()
}

/// Share of round trips with a positive blended R.
pub fn win_rate(finals: &[&TradeRecord]) -> f64 {
    if finals.is_empty() {
        return 0.0;
    }
    let wins = finals.iter().filter(|t| t.r_multiple > 0.0).count();
    wins as f64 / finals.len() as f64
}

pub fn mean_r(finals: &[&TradeRecord]) -> f64 {
    if finals.is_empty() {
        return 0.0;
    }
    finals.iter().map(|t| t.r_multiple).sum::<f64>() / finals.len() as f64
}

/// Gross profit / gross loss over every leg.
///
/// Capped at [`PROFIT_FACTOR_CAP`] when there are no losses; 0.0 with no profits.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.dollar_pnl > 0.0)
        .map(|t| t.dollar_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.dollar_pnl < 0.0)
        .map(|t| t.dollar_pnl.abs())
        .sum();
    if gross_loss < 1e-15 {
        return if gross_profit > 0.0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Maximum drawdown in percent (negative or zero).
pub fn max_drawdown_pct(curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &equity in curve {
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.min((equity - peak) / peak * 100.0);
        }
    }
    worst
}

pub fn exits_by_kind(trades: &[TradeRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for t in trades {
        *counts.entry(t.exit_kind.label()).or_insert(0) += 1;
    }
    counts
}
