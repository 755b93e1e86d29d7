//! Initial stop placement for a new entry.
//!
//! Two independent candidates:
//! - structure stop: `swing_low - swing_atr_buffer * ATR`
//! - cost-basis stop: `anchored_vwap - vwap_atr_buffer * ATR`
//!
//! The lower of the two is used.

use crate::domain::Bar;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// ATR buffers for the two initial stop candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialStopParams {
    pub swing_atr_buffer: f64,
    pub vwap_atr_buffer: f64,
}

impl Default for InitialStopParams {
    fn default() -> Self {
        Self {
            swing_atr_buffer: 0.5,
            vwap_atr_buffer: 1.0,
        }
    }
}

/// Initial stop for a long entry on `bar`.
///
/// Fails with `MissingIndicator` if ATR, swing low or anchored VWAP is absent.
pub fn initial_stop(bar: &Bar, params: &InitialStopParams) -> Result<f64> {
    let atr = bar.require_atr()?;
    let structure = bar.require_swing_low()? - params.swing_atr_buffer * atr;
    let cost_basis = bar.require_anchored_vwap()? - params.vwap_atr_buffer * atr;
    Ok(structure.min(cost_basis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use chrono::NaiveDate;

    fn bar() -> Bar {
        Bar::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 100.0)
    }

    #[test]
    fn structure_stop_is_lower() {
        // structure: 96 - 0.5*2 = 95; cost basis: 99 - 1.0*2 = 97
        let b = bar().with_atr(2.0).with_structure(96.0, 99.0);
        let stop = initial_stop(&b, &InitialStopParams::default()).unwrap();
        assert!((stop - 95.0).abs() < 1e-12);
    }

    #[test]
    fn cost_basis_stop_is_lower() {
        // structure: 98 - 1 = 97; cost basis: 96 - 2 = 94
        let b = bar().with_atr(2.0).with_structure(98.0, 96.0);
        let stop = initial_stop(&b, &InitialStopParams::default()).unwrap();
        assert!((stop - 94.0).abs() < 1e-12);
    }

    #[test]
    fn custom_buffers() {
        let params = InitialStopParams {
            swing_atr_buffer: 1.0,
            vwap_atr_buffer: 0.0,
        };
        // structure: 96 - 2 = 94; cost basis: 99
        let b = bar().with_atr(2.0).with_structure(96.0, 99.0);
        assert!((initial_stop(&b, &params).unwrap() - 94.0).abs() < 1e-12);
    }

    #[test]
    fn missing_atr() {
        let b = bar().with_structure(96.0, 99.0);
        assert!(matches!(
            initial_stop(&b, &InitialStopParams::default()),
            Err(EngineError::MissingIndicator { field: "atr", .. })
        ));
    }

    #[test]
    fn missing_vwap() {
        let mut b = bar().with_atr(2.0).with_structure(96.0, 99.0);
        b.anchored_vwap = None;
        assert!(matches!(
            initial_stop(&b, &InitialStopParams::default()),
            Err(EngineError::MissingIndicator { field: "anchored_vwap", .. })
        ));
    }
}
