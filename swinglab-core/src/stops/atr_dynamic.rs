//! ATR dynamic stop — a fixed ATR multiple below entry, clamped to a band.
//!
//! stop = entry_price - ATR * multiplier, clamped into
//! [entry_price - ATR * max_mult, entry_price - ATR * min_mult].

use crate::domain::{Bar, Position};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrDynamicParams {
    pub multiplier: f64,
    pub min_mult: f64,
    pub max_mult: f64,
}

impl Default for AtrDynamicParams {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            min_mult: 1.5,
            max_mult: 3.0,
        }
    }
}

impl AtrDynamicParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_mult > 0.0 && self.min_mult <= self.max_mult) {
            return Err(EngineError::InvalidConfig(format!(
                "atr_dynamic: need 0 < min_mult <= max_mult, got {} / {}",
                self.min_mult, self.max_mult
            )));
        }
        if !(self.multiplier > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "atr_dynamic: multiplier must be positive, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    pub fn candidate(&self, position: &Position, bar: &Bar) -> Result<Option<f64>> {
        let atr = bar.require_atr()?;
        let entry = position.entry_price;
        let raw = entry - atr * self.multiplier;
        let floor = entry - atr * self.max_mult;
        let ceiling = entry - atr * self.min_mult;
        Ok(Some(raw.max(floor).min(ceiling)))
    }
}
