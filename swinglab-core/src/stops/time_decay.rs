//! Time decay stop — the ATR multiple shrinks as the trade ages.
//!
//! The multiplier is `wide_mult` up to bar 5, falls linearly to `mid_mult`
//! at bar 10 and to `tight_mult` at bar 15, and stays at `tight_mult` after.
//!
//! stop = entry_price - ATR * multiplier(bars_since_entry)

use crate::domain::{Bar, Position};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

const WIDE_UNTIL: usize = 5;
const MID_AT: usize = 10;
const TIGHT_FROM: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDecayParams {
    pub wide_mult: f64,
    pub mid_mult: f64,
    pub tight_mult: f64,
}

impl Default for TimeDecayParams {
    fn default() -> Self {
        Self {
            wide_mult: 3.0,
            mid_mult: 2.0,
            tight_mult: 1.5,
        }
    }
}

impl TimeDecayParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.tight_mult > 0.0
            && self.tight_mult <= self.mid_mult
            && self.mid_mult <= self.wide_mult)
        {
            return Err(EngineError::InvalidConfig(format!(
                "time_decay: need 0 < tight_mult <= mid_mult <= wide_mult, got {} / {} / {}",
                self.tight_mult, self.mid_mult, self.wide_mult
            )));
        }
        Ok(())
    }

    /// ATR multiple after `bars` bars in the trade.
    pub fn multiplier(&self, bars: usize) -> f64 {
        if bars <= WIDE_UNTIL {
            self.wide_mult
        } else if bars <= MID_AT {
            let t = (bars - WIDE_UNTIL) as f64 / (MID_AT - WIDE_UNTIL) as f64;
            self.wide_mult + (self.mid_mult - self.wide_mult) * t
        } else if bars <= TIGHT_FROM {
            let t = (bars - MID_AT) as f64 / (TIGHT_FROM - MID_AT) as f64;
            self.mid_mult + (self.tight_mult - self.mid_mult) * t
        } else {
            self.tight_mult
        }
    }

    pub fn candidate(&self, position: &Position, bar: &Bar) -> Result<Option<f64>> {
        let atr = bar.require_atr()?;
        Ok(Some(
            position.entry_price - atr * self.multiplier(position.bars_since_entry),
        ))
    }
}
