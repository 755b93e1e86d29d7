//! Stop strategies — compute a candidate protective stop for an open position.
//!
//! A strategy is chosen once per backtest and never changes during it. Each
//! variant returns a raw candidate; the position applies the ratchet
//! (`max(candidate, stop_price)`), so stops may tighten but never loosen.
//!
//! ## Variants
//!
//! - `static`: keep the initial stop
//! - [`vol_regime`]: ATR multiple picked by volatility regime
//! - [`atr_dynamic`]: ATR multiple clamped to a band
//! - [`pct_trail`]: percentage below the peak close, after an R threshold
//! - [`time_decay`]: ATR multiple shrinking with trade age

pub mod atr_dynamic;
pub mod initial;
pub mod pct_trail;
pub mod ratchet;
pub mod time_decay;
pub mod vol_regime;

pub use atr_dynamic::AtrDynamicParams;
pub use initial::{initial_stop, InitialStopParams};
pub use pct_trail::PctTrailParams;
pub use time_decay::TimeDecayParams;
pub use vol_regime::{VolRegime, VolRegimeParams};

use crate::domain::{Bar, ExitKind, Position};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Tag of a stop strategy, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStrategyKind {
    Static,
    VolRegime,
    AtrDynamic,
    PctTrail,
    TimeDecay,
}

impl StopStrategyKind {
    pub const ALL: [StopStrategyKind; 5] = [
        StopStrategyKind::Static,
        StopStrategyKind::VolRegime,
        StopStrategyKind::AtrDynamic,
        StopStrategyKind::PctTrail,
        StopStrategyKind::TimeDecay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StopStrategyKind::Static => "static",
            StopStrategyKind::VolRegime => "vol_regime",
            StopStrategyKind::AtrDynamic => "atr_dynamic",
            StopStrategyKind::PctTrail => "pct_trail",
            StopStrategyKind::TimeDecay => "time_decay",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Per-strategy parameter blocks, as they appear in configuration.
///
/// Only the block of the selected strategy is used.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StopParams {
    pub vol_regime: VolRegimeParams,
    pub atr_dynamic: AtrDynamicParams,
    pub pct_trail: PctTrailParams,
    pub time_decay: TimeDecayParams,
}

/// The stop strategy of a backtest run, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopStrategy {
    Static,
    VolRegime(VolRegimeParams),
    AtrDynamic(AtrDynamicParams),
    PctTrail(PctTrailParams),
    TimeDecay(TimeDecayParams),
}

impl StopStrategy {
    /// Build a strategy from its configuration tag and parameter blocks.
    ///
    /// Unknown tags fail here, before any bar is processed.
    pub fn from_tag(tag: &str, params: &StopParams) -> Result<Self> {
        let kind = StopStrategyKind::from_name(tag)
            .ok_or_else(|| EngineError::UnsupportedStrategy(tag.to_string()))?;
        let strategy = Self::with_params(kind, params);
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn with_params(kind: StopStrategyKind, params: &StopParams) -> Self {
        match kind {
            StopStrategyKind::Static => StopStrategy::Static,
            StopStrategyKind::VolRegime => StopStrategy::VolRegime(params.vol_regime),
            StopStrategyKind::AtrDynamic => StopStrategy::AtrDynamic(params.atr_dynamic),
            StopStrategyKind::PctTrail => StopStrategy::PctTrail(params.pct_trail),
            StopStrategyKind::TimeDecay => StopStrategy::TimeDecay(params.time_decay),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StopStrategy::Static => Ok(()),
            StopStrategy::VolRegime(p) => p.validate(),
            StopStrategy::AtrDynamic(p) => p.validate(),
            StopStrategy::PctTrail(p) => p.validate(),
            StopStrategy::TimeDecay(p) => p.validate(),
        }
    }

    pub fn kind(&self) -> StopStrategyKind {
        match self {
            StopStrategy::Static => StopStrategyKind::Static,
            StopStrategy::VolRegime(_) => StopStrategyKind::VolRegime,
            StopStrategy::AtrDynamic(_) => StopStrategyKind::AtrDynamic,
            StopStrategy::PctTrail(_) => StopStrategyKind::PctTrail,
            StopStrategy::TimeDecay(_) => StopStrategyKind::TimeDecay,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_static(&self) -> bool {
        matches!(self, StopStrategy::Static)
    }

    /// Exit label used when the protective stop is hit under this strategy.
    pub fn stop_exit_kind(&self) -> ExitKind {
        match self {
            StopStrategy::Static => ExitKind::HardStop,
            other => ExitKind::StrategyStop(other.kind()),
        }
    }

    /// Raw candidate stop for `position` on `bar`. `None` means "no opinion".
    pub fn candidate_stop(&self, position: &Position, bar: &Bar) -> Result<Option<f64>> {
        match self {
            StopStrategy::Static => Ok(None),
            StopStrategy::VolRegime(p) => p.candidate(position, bar),
            StopStrategy::AtrDynamic(p) => p.candidate(position, bar),
            StopStrategy::PctTrail(p) => p.candidate(position, bar),
            StopStrategy::TimeDecay(p) => p.candidate(position, bar),
        }
    }
}

impl Default for StopStrategy {
    fn default() -> Self {
        StopStrategy::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn from_tag_known() {
        let params = StopParams::default();
        for kind in StopStrategyKind::ALL {
            let s = StopStrategy::from_tag(kind.name(), &params).unwrap();
            assert_eq!(s.kind(), kind);
            assert_eq!(s.name(), kind.name());
        }
    }

    #[test]
    fn from_tag_unknown_fails_fast() {
        let err = StopStrategy::from_tag("chandelier", &StopParams::default()).unwrap_err();
        assert_eq!(err, EngineError::UnsupportedStrategy("chandelier".into()));
    }

    #[test]
    fn from_tag_validates_params() {
        let mut params = StopParams::default();
        params.atr_dynamic.min_mult = 5.0;
        assert!(matches!(
            StopStrategy::from_tag("atr_dynamic", &params),
            Err(EngineError::InvalidConfig(_))
        ));
        // Other strategies ignore the broken block.
        assert!(StopStrategy::from_tag("time_decay", &params).is_ok());
    }

    #[test]
    fn static_has_no_candidate() {
        let pos = Position::open(
            "SPY",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            0,
            100.0,
            95.0,
            10,
            1.0,
        )
        .unwrap();
        let bar = Bar::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 50.0);
        assert_eq!(StopStrategy::Static.candidate_stop(&pos, &bar).unwrap(), None);
    }

    #[test]
    fn stop_exit_labels() {
        assert_eq!(StopStrategy::Static.stop_exit_kind(), ExitKind::HardStop);
        assert_eq!(
            StopStrategy::TimeDecay(TimeDecayParams::default())
                .stop_exit_kind()
                .label(),
            "TIME_DECAY_STOP"
        );
    }

    #[test]
    fn tagged_serialization() {
        let s = StopStrategy::PctTrail(PctTrailParams {
            activation_r: 1.5,
            trail_pct: 4.0,
        });
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains(r#""type":"pct_trail""#));
        let back: StopStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
