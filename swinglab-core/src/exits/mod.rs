//! Exit evaluation — the per-position state machine run on every new bar.
//!
//! On each bar after the entry bar, in this fixed order:
//!
//! 1. Mark the position: bars since entry, current/peak R, peak price
//! 2. Ratchet the protective stop toward the strategy's candidate
//! 3. Protective stop hit (`close < stop`): full exit at the stop
//! 4. External exit signal: full exit at the close
//! 5. Time stop: too old and below `time_stop_min_r`, full exit at the close
//! 6. Profit target: first touch of `profit_target_r` scales out
//!    `partial_exit_fraction` and arms the trailing stop
//! 7. Trailing stop: close below the trail exits the remainder at the trail
//!
//! The entry bar itself is always a no-op.

pub mod trailing;

pub use trailing::window_min_close;

use crate::domain::{Bar, ExitKind, Position};
use crate::error::{EngineError, Result};
use crate::stops::StopStrategy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Exit thresholds shared by every stop strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    /// Bars after which a trade that has not reached `time_stop_min_r` is cut. 0 disables.
    pub time_stop_bars: usize,
    pub time_stop_min_r: f64,
    pub profit_target_r: f64,
    /// Share of the original quantity sold at the profit target.
    pub partial_exit_fraction: f64,
    pub trail_lookback_bars: usize,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            time_stop_bars: 20,
            time_stop_min_r: 1.0,
            profit_target_r: 2.0,
            partial_exit_fraction: 0.5,
            trail_lookback_bars: 10,
        }
    }
}

impl ExitRules {
    pub fn validate(&self) -> Result<()> {
        if !(self.partial_exit_fraction > 0.0 && self.partial_exit_fraction <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "partial_exit_fraction must be in (0, 1], got {}",
                self.partial_exit_fraction
            )));
        }
        if !(self.profit_target_r > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "profit_target_r must be positive, got {}",
                self.profit_target_r
            )));
        }
        if self.trail_lookback_bars == 0 {
            return Err(EngineError::InvalidConfig(
                "trail_lookback_bars must be at least 1".into(),
            ));
        }
        if !self.time_stop_min_r.is_finite() {
            return Err(EngineError::InvalidConfig(
                "time_stop_min_r must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of evaluating one position on one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExitDecision {
    Hold,
    Exit {
        kind: ExitKind,
        price: f64,
        /// Share of the original quantity to exit; 1.0 closes the remainder.
        fraction: f64,
    },
}

impl ExitDecision {
    fn full(kind: ExitKind, price: f64) -> Self {
        ExitDecision::Exit {
            kind,
            price,
            fraction: 1.0,
        }
    }

    pub fn should_exit(&self) -> bool {
        matches!(self, ExitDecision::Exit { .. })
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, ExitDecision::Exit { fraction, .. } if *fraction < 1.0)
    }

    pub fn kind(&self) -> Option<&ExitKind> {
        match self {
            ExitDecision::Hold => None,
            ExitDecision::Exit { kind, .. } => Some(kind),
        }
    }
}

/// Runs the exit state machine for one backtest's stop strategy and rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitEvaluator {
    strategy: StopStrategy,
    rules: ExitRules,
}

impl ExitEvaluator {
    pub fn new(strategy: StopStrategy, rules: ExitRules) -> Result<Self> {
        strategy.validate()?;
        rules.validate()?;
        Ok(Self { strategy, rules })
    }

    pub fn strategy(&self) -> &StopStrategy {
        &self.strategy
    }

    pub fn rules(&self) -> &ExitRules {
        &self.rules
    }

    /// Advance `position` to the last bar of `history` and decide whether to exit.
    ///
    /// `history` is the instrument's bar series up to and including the
    /// current bar, indexed the same way as `position.entry_bar`.
    /// `external_exit` is an exit kind raised by the signal layer, if any.
    pub fn evaluate(
        &self,
        position: &mut Position,
        history: &[Bar],
        external_exit: Option<&str>,
    ) -> ExitDecision {
        let Some(bar) = history.last() else {
            return ExitDecision::Hold;
        };
        let bars_since_entry = (history.len() - 1).saturating_sub(position.entry_bar);
        if bars_since_entry == 0 {
            return ExitDecision::Hold;
        }

        let price = bar.close;
        position.mark(price, bars_since_entry);
        self.ratchet_stop(position, bar);

        if price < position.stop_price {
            return ExitDecision::full(self.strategy.stop_exit_kind(), position.stop_price);
        }

        if let Some(kind) = external_exit {
            return ExitDecision::full(ExitKind::Signal(kind.to_string()), price);
        }

        if self.rules.time_stop_bars > 0
            && bars_since_entry >= self.rules.time_stop_bars
            && position.current_r_multiple < self.rules.time_stop_min_r
        {
            return ExitDecision::full(ExitKind::TimeStop, price);
        }

        if !position.profit_target_taken
            && position.current_r_multiple >= self.rules.profit_target_r
        {
            position.profit_target_taken = true;
            position.locked_target_r = Some(self.rules.profit_target_r);
            position.trailing_stop_active = true;
            let seed = window_min_close(history, self.rules.trail_lookback_bars).unwrap_or(price);
            position.ratchet_trailing_stop(seed);
            debug!(
                symbol = %position.symbol,
                r = position.current_r_multiple,
                trail = seed,
                "profit target reached, trailing stop armed"
            );
            return ExitDecision::Exit {
                kind: ExitKind::ProfitTarget,
                price,
                fraction: self.rules.partial_exit_fraction,
            };
        }

        if position.trailing_stop_active {
            if let Some(level) = window_min_close(history, self.rules.trail_lookback_bars) {
                position.ratchet_trailing_stop(level);
            }
            if let Some(trail) = position.trailing_stop_price {
                if price < trail {
                    return ExitDecision::full(ExitKind::TrailStop, trail);
                }
            }
        }

        ExitDecision::Hold
    }

    /// Step 2: move the protective stop toward the strategy candidate.
    ///
    /// A missing indicator keeps the last known stop.
    fn ratchet_stop(&self, position: &mut Position, bar: &Bar) {
        if self.strategy.is_static() {
            return;
        }
        match self.strategy.candidate_stop(position, bar) {
            Ok(Some(candidate)) => {
                let before = position.stop_price;
                if position.ratchet_stop(candidate) {
                    debug!(
                        symbol = %position.symbol,
                        strategy = self.strategy.name(),
                        from = before,
                        to = position.stop_price,
                        "stop ratcheted"
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                debug!(
                    symbol = %position.symbol,
                    error = %err,
                    "stop unchanged"
                );
            }
        }
    }
}
