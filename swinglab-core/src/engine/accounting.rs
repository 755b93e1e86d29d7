use serde::{Deserialize, Serialize};

/// Account equity for one backtest run.
///
/// Equity moves only on realised P&L. The value is created at the start of a
/// run and handed by `&mut` to every close, so updates are applied in the
/// order the caller sequences them and sizing reads the latest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    starting_equity: f64,
    current_equity: f64,
    realized_pnl: f64,
    trade_count: usize,
    /// Equity after each realised P&L event, starting with the opening balance.
    equity_history: Vec<f64>,
}

impl AccountState {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            starting_equity,
            current_equity: starting_equity,
            realized_pnl: 0.0,
            trade_count: 0,
            equity_history: vec![starting_equity],
        }
    }

    /// Book realised P&L and return the new equity.
    pub fn apply_pnl(&mut self, pnl: f64) -> f64 {
        self.current_equity += pnl;
        self.realized_pnl += pnl;
        self.trade_count += 1;
        self.equity_history.push(self.current_equity);
        self.current_equity
    }

    pub fn starting_equity(&self) -> f64 {
        self.starting_equity
    }

    pub fn current_equity(&self) -> f64 {
        self.current_equity
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Number of realised P&L events (full and partial exits).
    pub fn trade_count(&self) -> usize {
        self.trade_count
    }

    pub fn equity_history(&self) -> &[f64] {
        &self.equity_history
    }

    pub fn is_depleted(&self) -> bool {
        self.current_equity <= 0.0
    }

    /// Return since the start of the run, in percent.
    pub fn total_return_pct(&self) -> f64 {
        if self.starting_equity <= 0.0 {
            return 0.0;
        }
        (self.current_equity / self.starting_equity - 1.0) * 100.0
    }
}
