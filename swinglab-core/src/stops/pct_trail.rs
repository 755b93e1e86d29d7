//! Percent trailing stop — trail a fixed percentage below the peak close.
//!
//! Inactive until the position has reached `activation_r`; from then on
//! stop = peak_price_since_entry * (1 - trail_pct / 100).
//!
//! Activation is keyed on the peak R-multiple, so once reached it stays on.

use crate::domain::{Bar, Position};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PctTrailParams {
    /// R-multiple that switches the trail on.
    pub activation_r: f64,
    /// Trail distance in percent (5.0 = 5%).
    pub trail_pct: f64,
}

impl Default for PctTrailParams {
    fn default() -> Self {
        Self {
            activation_r: 1.0,
            trail_pct: 5.0,
        }
    }
}

impl PctTrailParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.trail_pct > 0.0 && self.trail_pct < 100.0) {
            return Err(EngineError::InvalidConfig(format!(
                "pct_trail: trail_pct must be in (0, 100), got {}",
                self.trail_pct
            )));
        }
        if !self.activation_r.is_finite() {
            return Err(EngineError::InvalidConfig(
                "pct_trail: activation_r must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn is_active(&self, position: &Position) -> bool {
        position.peak_r_multiple >= self.activation_r
    }

    pub fn candidate(&self, position: &Position, _bar: &Bar) -> Result<Option<f64>> {
        if !self.is_active(position) {
            return Ok(None);
        }
        Ok(Some(
            position.peak_price_since_entry * (1.0 - self.trail_pct / 100.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(close: f64) -> Bar {
        Bar::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), close)
    }

    fn make_position() -> Position {
        Position::open(
            "SPY",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            0,
            100.0,
            95.0,
            10,
            100_000.0,
        )
        .unwrap()
    }

    #[test]
    fn inactive_below_activation() {
        let p = PctTrailParams::default();
        let mut pos = make_position();
        pos.mark(104.0, 1); // 0.8R
        assert_eq!(p.candidate(&pos, &make_bar(104.0)).unwrap(), None);
    }

    #[test]
    fn trails_peak_once_active() {
        let p = PctTrailParams::default();
        let mut pos = make_position();
        pos.mark(120.0, 3); // 4R, peak 120
        let stop = p.candidate(&pos, &make_bar(120.0)).unwrap().unwrap();
        assert!((stop - 114.0).abs() < 1e-12);
    }

    #[test]
    fn stays_active_after_pullback() {
        let p = PctTrailParams::default();
        let mut pos = make_position();
        pos.mark(110.0, 1); // 2R
        pos.mark(101.0, 2); // back to 0.2R
        let stop = p.candidate(&pos, &make_bar(101.0)).unwrap().unwrap();
        assert!((stop - 104.5).abs() < 1e-12);
    }

    #[test]
    fn validate_trail_pct() {
        assert!(PctTrailParams::default().validate().is_ok());
        let bad = PctTrailParams {
            trail_pct: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
