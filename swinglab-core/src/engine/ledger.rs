//! Position ledger — owns open positions and the closed-trade list.
//!
//! All mutation goes through three methods:
//! - [`PositionLedger::open`] sizes and stores a new position
//! - [`PositionLedger::update`] runs the exit state machine on a stored position
//! - [`PositionLedger::close`] realises a full or partial exit and appends a record

use crate::domain::{Bar, ExitKind, Position, TradeRecord};
use crate::engine::accounting::AccountState;
use crate::error::{EngineError, Result};
use crate::exits::{ExitDecision, ExitEvaluator};
use crate::sizers::PositionSizer;
use crate::stops::StopStrategyKind;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

/// An exit to realise on an open position.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitOrder {
    pub kind: ExitKind,
    pub price: f64,
    pub date: NaiveDate,
    pub bar_index: usize,
    /// Share of the original quantity; 1.0 closes whatever remains.
    pub fraction: f64,
}

impl ExitOrder {
    pub fn full(kind: ExitKind, price: f64, date: NaiveDate, bar_index: usize) -> Self {
        Self {
            kind,
            price,
            date,
            bar_index,
            fraction: 1.0,
        }
    }

    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Turn an evaluator decision on `bar` into an order. `None` for `Hold`.
    pub fn from_decision(decision: &ExitDecision, bar: &Bar, bar_index: usize) -> Option<Self> {
        match decision {
            ExitDecision::Hold => None,
            ExitDecision::Exit {
                kind,
                price,
                fraction,
            } => Some(Self::full(kind.clone(), *price, bar.date, bar_index).with_fraction(*fraction)),
        }
    }
}

/// Open positions keyed by symbol, plus every realised exit in order.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    sizer: PositionSizer,
    strategy: StopStrategyKind,
    positions: HashMap<String, Position>,
    trades: Vec<TradeRecord>,
}

impl PositionLedger {
    pub fn new(sizer: PositionSizer, strategy: StopStrategyKind) -> Self {
        Self {
            sizer,
            strategy,
            positions: HashMap::new(),
            trades: Vec::new(),
        }
    }

    /// Size and open a long position at `entry_price` with `stop_price` as
    /// the initial stop.
    ///
    /// # Errors
    /// - `DuplicatePosition` if `symbol` already has an open position
    /// - `InvalidStop`, `ZeroSize`, `DepletedEquity` from the sizer
    pub fn open(
        &mut self,
        symbol: &str,
        entry_date: NaiveDate,
        entry_price: f64,
        stop_price: f64,
        bar_index: usize,
        account: &AccountState,
    ) -> Result<&Position> {
        if self.positions.contains_key(symbol) {
            return Err(EngineError::DuplicatePosition(symbol.to_string()));
        }

        let equity = account.current_equity();
        let quantity = self.sizer.size(entry_price, stop_price, equity)?;
        let position = Position::open(
            symbol,
            entry_date,
            bar_index,
            entry_price,
            stop_price,
            quantity,
            equity,
        )?;

        info!(
            symbol = %symbol,
            date = %entry_date,
            entry = entry_price,
            stop = stop_price,
            quantity,
            "position opened"
        );

        Ok(self.positions.entry(symbol.to_string()).or_insert(position))
    }

    /// Run the exit state machine for `symbol` on the last bar of `history`.
    pub fn update(
        &mut self,
        evaluator: &ExitEvaluator,
        symbol: &str,
        history: &[Bar],
        external_exit: Option<&str>,
    ) -> Result<ExitDecision> {
        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| EngineError::UnknownPosition(symbol.to_string()))?;
        Ok(evaluator.evaluate(position, history, external_exit))
    }

    /// Realise an exit on `symbol`, credit the account and append the record.
    ///
    /// A fractional order sells `floor(original_quantity * fraction)` shares
    /// and leaves the rest open. If that rounds to nothing or to everything
    /// left, the order closes the position instead.
    ///
    /// The final leg's `r_multiple` averages its own R with the R credited to
    /// each earlier partial. A profit-target partial is credited at the locked
    /// target R, not its fill, so a gap through the target does not inflate it.
    pub fn close(
        &mut self,
        account: &mut AccountState,
        symbol: &str,
        order: ExitOrder,
    ) -> Result<TradeRecord> {
        if !(order.fraction > 0.0 && order.fraction <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "exit fraction must be in (0, 1], got {}",
                order.fraction
            )));
        }
        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| EngineError::UnknownPosition(symbol.to_string()))?;

        let remaining = position.quantity;
        let quantity = if order.fraction < 1.0 {
            let requested = (position.original_quantity as f64 * order.fraction).floor() as u64;
            if requested == 0 || requested >= remaining {
                remaining
            } else {
                requested
            }
        } else {
            remaining
        };
        let is_partial = quantity < remaining;

        let leg_r = position.r_multiple_at(order.price);
        let r_multiple = if !is_partial && !position.partial_r_multiples.is_empty() {
            let legs = position.partial_r_multiples.len() as f64 + 1.0;
            (position.partial_r_multiples.iter().sum::<f64>() + leg_r) / legs
        } else {
            leg_r
        };

        let dollar_pnl = (order.price - position.entry_price) * quantity as f64;
        let equity_after_trade = account.apply_pnl(dollar_pnl);

        let record = TradeRecord {
            symbol: symbol.to_string(),
            stop_strategy: self.strategy.name().to_string(),
            entry_bar: position.entry_bar,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            initial_stop_price: position.initial_stop_price,
            exit_bar: order.bar_index,
            exit_date: order.date,
            exit_price: order.price,
            exit_kind: order.kind,
            quantity,
            is_partial,
            exit_fraction: quantity as f64 / position.original_quantity as f64,
            r_multiple,
            leg_r_multiple: leg_r,
            profit_pct: (order.price / position.entry_price - 1.0) * 100.0,
            dollar_pnl,
            equity_after_trade,
            bars_held: order.bar_index.saturating_sub(position.entry_bar),
            peak_r_multiple: position.peak_r_multiple,
        };

        if is_partial {
            position.quantity -= quantity;
            position.exited_quantity += quantity;
            let credited = match (&record.exit_kind, position.locked_target_r) {
                (ExitKind::ProfitTarget, Some(target_r)) => target_r,
                _ => leg_r,
            };
            position.partial_r_multiples.push(credited);
        } else {
            self.positions.remove(symbol);
        }

        info!(
            symbol = %symbol,
            date = %record.exit_date,
            kind = %record.exit_kind,
            price = record.exit_price,
            quantity = record.quantity,
            r = record.r_multiple,
            pnl = record.dollar_pnl,
            equity = record.equity_after_trade,
            "exit realised"
        );

        self.trades.push(record.clone());
        Ok(record)
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Symbols with an open position, sorted.
    pub fn open_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.positions.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    pub fn sizer(&self) -> &PositionSizer {
        &self.sizer
    }
}
