//! Position — the state machine record for one open long position.

use crate::error::{EngineError, Result};
use crate::stops::ratchet::ratchet_long;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An open long position.
///
/// Owned exclusively by [`PositionLedger`](crate::engine::PositionLedger).
/// Outside code only ever sees `&Position`; the exit state machine fields
/// (`profit_target_taken`, `trailing_stop_*`, R tracking) are advanced by the
/// [`ExitEvaluator`](crate::exits::ExitEvaluator) and quantities by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_date: NaiveDate,
    /// Index of the entry bar in the instrument's bar series.
    pub entry_bar: usize,
    pub entry_price: f64,
    /// Stop at entry. Defines 1R for the life of the position.
    pub initial_stop_price: f64,
    /// Current protective stop. Only ever rises.
    pub stop_price: f64,

    pub quantity: u64,
    pub original_quantity: u64,
    /// Shares already scaled out.
    pub exited_quantity: u64,

    pub bars_since_entry: usize,
    pub current_r_multiple: f64,
    pub peak_r_multiple: f64,
    pub peak_price_since_entry: f64,

    pub profit_target_taken: bool,
    pub trailing_stop_active: bool,
    pub trailing_stop_price: Option<f64>,
    /// R credited to the profit-target scale-out, set when the target is taken.
    #[serde(default)]
    pub locked_target_r: Option<f64>,
    /// R-multiples credited to earlier partial exits.
    pub partial_r_multiples: Vec<f64>,

    /// Account equity when the position was sized. Informational.
    pub equity_at_entry: f64,
}

impl Position {
    /// Create a position. Fails if the stop is not strictly below the entry or
    /// the quantity is zero.
    pub fn open(
        symbol: impl Into<String>,
        entry_date: NaiveDate,
        entry_bar: usize,
        entry_price: f64,
        stop_price: f64,
        quantity: u64,
        equity_at_entry: f64,
    ) -> Result<Self> {
        if !(entry_price > 0.0) || !(stop_price < entry_price) {
            return Err(EngineError::InvalidStop {
                entry_price,
                stop_price,
            });
        }
        if quantity == 0 {
            return Err(EngineError::ZeroSize {
                risk_amount: 0.0,
                risk_per_unit: entry_price - stop_price,
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            entry_date,
            entry_bar,
            entry_price,
            initial_stop_price: stop_price,
            stop_price,
            quantity,
            original_quantity: quantity,
            exited_quantity: 0,
            bars_since_entry: 0,
            current_r_multiple: 0.0,
            peak_r_multiple: 0.0,
            peak_price_since_entry: entry_price,
            profit_target_taken: false,
            trailing_stop_active: false,
            trailing_stop_price: None,
            locked_target_r: None,
            partial_r_multiples: Vec::new(),
            equity_at_entry,
        })
    }

    /// Initial per-share risk (1R in dollars per share).
    pub fn risk_per_unit(&self) -> f64 {
        self.entry_price - self.initial_stop_price
    }

    /// R-multiple of a hypothetical exit at `price`.
    pub fn r_multiple_at(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.risk_per_unit()
    }

    /// Mark the position to `price` on the bar `bars_since_entry` bars after entry.
    pub fn mark(&mut self, price: f64, bars_since_entry: usize) {
        self.bars_since_entry = bars_since_entry;
        self.current_r_multiple = self.r_multiple_at(price);
        self.peak_r_multiple = self.peak_r_multiple.max(self.current_r_multiple);
        self.peak_price_since_entry = self.peak_price_since_entry.max(price);
    }

    /// Ratchet the protective stop toward `candidate`. Returns true if it moved.
    pub fn ratchet_stop(&mut self, candidate: f64) -> bool {
        let next = ratchet_long(candidate, self.stop_price);
        let moved = next > self.stop_price;
        self.stop_price = next;
        moved
    }

    /// Ratchet the trailing stop (after the profit target) toward `candidate`.
    pub fn ratchet_trailing_stop(&mut self, candidate: f64) -> f64 {
        let next = match self.trailing_stop_price {
            Some(current) => ratchet_long(candidate, current),
            None => candidate,
        };
        self.trailing_stop_price = Some(next);
        next
    }

    pub fn is_partially_exited(&self) -> bool {
        self.exited_quantity > 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }
}
