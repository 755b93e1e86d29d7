//! Bar — one row of the precomputed indicator table.

use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily bar for a single symbol, carrying the precomputed indicators and the
/// entry/exit decisions of the upstream signal layer.
///
/// Indicator columns are optional: a warmup gap or a data hole is `None` (a
/// `NaN` in the source table is treated the same way). The `require_*`
/// accessors turn a gap into [`EngineError::MissingIndicator`] so no default
/// value ever leaks into a stop or size computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: u64,

    // ── Indicators ──
    /// ATR over 20 bars.
    #[serde(default)]
    pub atr: Option<f64>,
    #[serde(default)]
    pub anchored_vwap: Option<f64>,
    #[serde(default)]
    pub swing_low: Option<f64>,
    #[serde(default)]
    pub swing_high: Option<f64>,
    /// Z-score of current volatility against its own history.
    #[serde(default)]
    pub vol_zscore: Option<f64>,

    // ── Signals ──
    #[serde(default)]
    pub entry_signal: bool,
    /// Opaque exit kind from the signal layer (e.g. "distribution_warning").
    #[serde(default)]
    pub exit_signal: Option<String>,
}

impl Bar {
    /// Price-only bar with no indicators and no signals.
    pub fn new(symbol: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            atr: None,
            anchored_vwap: None,
            swing_low: None,
            swing_high: None,
            vol_zscore: None,
            entry_signal: false,
            exit_signal: None,
        }
    }

    pub fn with_atr(mut self, atr: f64) -> Self {
        self.atr = Some(atr);
        self
    }

    pub fn with_structure(mut self, swing_low: f64, anchored_vwap: f64) -> Self {
        self.swing_low = Some(swing_low);
        self.anchored_vwap = Some(anchored_vwap);
        self
    }

    pub fn with_vol_zscore(mut self, z: f64) -> Self {
        self.vol_zscore = Some(z);
        self
    }

    pub fn with_entry_signal(mut self) -> Self {
        self.entry_signal = true;
        self
    }

    pub fn with_exit_signal(mut self, kind: impl Into<String>) -> Self {
        self.exit_signal = Some(kind.into());
        self
    }

    pub fn require_atr(&self) -> Result<f64> {
        self.require("atr", self.atr)
    }

    pub fn require_anchored_vwap(&self) -> Result<f64> {
        self.require("anchored_vwap", self.anchored_vwap)
    }

    pub fn require_swing_low(&self) -> Result<f64> {
        self.require("swing_low", self.swing_low)
    }

    pub fn require_vol_zscore(&self) -> Result<f64> {
        self.require("vol_zscore", self.vol_zscore)
    }

    fn require(&self, field: &'static str, value: Option<f64>) -> Result<f64> {
        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(EngineError::MissingIndicator {
                field,
                symbol: self.symbol.clone(),
                date: self.date,
            }),
        }
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
        {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}
