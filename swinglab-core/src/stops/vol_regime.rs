//! Volatility-regime stop — the ATR multiple depends on the volatility regime.
//!
//! The bar's volatility z-score is classified against two thresholds:
//! below `low_threshold` is a quiet market (tighter stop), above
//! `high_threshold` a volatile one (wider stop).
//!
//! stop = entry_price - ATR * regime_multiplier

use crate::domain::{Bar, Position};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolRegime {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolRegimeParams {
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub low_mult: f64,
    pub normal_mult: f64,
    pub high_mult: f64,
}

impl Default for VolRegimeParams {
    fn default() -> Self {
        Self {
            low_threshold: -1.0,
            high_threshold: 1.0,
            low_mult: 1.5,
            normal_mult: 2.0,
            high_mult: 3.0,
        }
    }
}

impl VolRegimeParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.low_threshold < self.high_threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "vol_regime: low_threshold {} must be below high_threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        for (name, m) in [
            ("low_mult", self.low_mult),
            ("normal_mult", self.normal_mult),
            ("high_mult", self.high_mult),
        ] {
            if !(m > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "vol_regime: {name} must be positive, got {m}"
                )));
            }
        }
        Ok(())
    }

    pub fn classify(&self, zscore: f64) -> VolRegime {
        if zscore < self.low_threshold {
            VolRegime::Low
        } else if zscore > self.high_threshold {
            VolRegime::High
        } else {
            VolRegime::Normal
        }
    }

    pub fn multiplier(&self, regime: VolRegime) -> f64 {
        match regime {
            VolRegime::Low => self.low_mult,
            VolRegime::Normal => self.normal_mult,
            VolRegime::High => self.high_mult,
        }
    }

    pub fn candidate(&self, position: &Position, bar: &Bar) -> Result<Option<f64>> {
        let atr = bar.require_atr()?;
        let regime = self.classify(bar.require_vol_zscore()?);
        Ok(Some(position.entry_price - atr * self.multiplier(regime)))
    }
}
