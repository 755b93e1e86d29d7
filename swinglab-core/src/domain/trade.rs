//! TradeRecord — one realised exit event (full or partial) with P&L and
//! diagnostics, plus the exit kind taxonomy.

use crate::stops::StopStrategyKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position (or part of it) was exited.
///
/// Serialized as its upper-case label (`"HARD_STOP"`, `"TIME_DECAY_STOP"`,
/// `"SIGNAL:distribution_warning"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ExitKind {
    /// Protective stop hit under the static strategy.
    HardStop,
    /// Protective stop hit while a dynamic stop strategy was managing it.
    StrategyStop(StopStrategyKind),
    TimeStop,
    ProfitTarget,
    TrailStop,
    /// Exit requested by the upstream signal layer.
    Signal(String),
    /// Still open at the last bar of the series.
    EndOfData,
}

impl ExitKind {
    pub fn label(&self) -> String {
        match self {
            ExitKind::HardStop => "HARD_STOP".into(),
            ExitKind::StrategyStop(kind) => format!("{}_STOP", kind.name().to_uppercase()),
            ExitKind::TimeStop => "TIME_STOP".into(),
            ExitKind::ProfitTarget => "PROFIT_TARGET".into(),
            ExitKind::TrailStop => "TRAIL_STOP".into(),
            ExitKind::Signal(kind) => format!("SIGNAL:{kind}"),
            ExitKind::EndOfData => "END_OF_DATA".into(),
        }
    }

    /// True for any protective-stop exit (hard or strategy-qualified).
    pub fn is_stop(&self) -> bool {
        matches!(self, ExitKind::HardStop | ExitKind::StrategyStop(_))
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "HARD_STOP" => return Some(ExitKind::HardStop),
            "TIME_STOP" => return Some(ExitKind::TimeStop),
            "PROFIT_TARGET" => return Some(ExitKind::ProfitTarget),
            "TRAIL_STOP" => return Some(ExitKind::TrailStop),
            "END_OF_DATA" => return Some(ExitKind::EndOfData),
            _ => {}
        }
        if let Some(kind) = label.strip_prefix("SIGNAL:") {
            return Some(ExitKind::Signal(kind.to_string()));
        }
        let tag = label.strip_suffix("_STOP")?.to_lowercase();
        match StopStrategyKind::from_name(&tag)? {
            StopStrategyKind::Static => None,
            kind => Some(ExitKind::StrategyStop(kind)),
        }
    }
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<ExitKind> for String {
    fn from(kind: ExitKind) -> Self {
        kind.label()
    }
}

impl TryFrom<String> for ExitKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ExitKind::parse(&value).ok_or_else(|| format!("unknown exit kind: {value}"))
    }
}

/// A realised exit. Created once by the ledger, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub symbol: String,
    pub stop_strategy: String,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub initial_stop_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_kind: ExitKind,

    // ── Size ──
    /// Shares exited by this event.
    pub quantity: u64,
    pub is_partial: bool,
    /// Share of the original quantity exited by this event.
    pub exit_fraction: f64,

    // ── PnL ──
    /// Reported R: blended across legs for a final exit after a scale-out.
    pub r_multiple: f64,
    /// R of this leg alone.
    pub leg_r_multiple: f64,
    pub profit_pct: f64,
    pub dollar_pnl: f64,
    pub equity_after_trade: f64,

    // ── Diagnostics ──
    pub bars_held: usize,
    pub peak_r_multiple: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.dollar_pnl > 0.0
    }

    /// True for the record that closes a position (no shares remain).
    pub fn is_final(&self) -> bool {
        !self.is_partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            symbol: "SPY".into(),
            stop_strategy: "static".into(),
            entry_bar: 4,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_price: 100.0,
            initial_stop_price: 95.0,
            exit_bar: 8,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            exit_price: 110.0,
            exit_kind: ExitKind::ProfitTarget,
            quantity: 100,
            is_partial: true,
            exit_fraction: 0.5,
            r_multiple: 2.0,
            leg_r_multiple: 2.0,
            profit_pct: 10.0,
            dollar_pnl: 1000.0,
            equity_after_trade: 101_000.0,
            bars_held: 4,
            peak_r_multiple: 2.0,
        }
    }

    #[test]
    fn labels() {
        assert_eq!(ExitKind::HardStop.label(), "HARD_STOP");
        assert_eq!(
            ExitKind::StrategyStop(StopStrategyKind::TimeDecay).label(),
            "TIME_DECAY_STOP"
        );
        assert_eq!(
            ExitKind::StrategyStop(StopStrategyKind::PctTrail).label(),
            "PCT_TRAIL_STOP"
        );
        assert_eq!(
            ExitKind::Signal("sell_signal".into()).label(),
            "SIGNAL:sell_signal"
        );
        assert_eq!(ExitKind::EndOfData.to_string(), "END_OF_DATA");
    }

    #[test]
    fn parse_inverts_label() {
        let kinds = [
            ExitKind::HardStop,
            ExitKind::StrategyStop(StopStrategyKind::VolRegime),
            ExitKind::StrategyStop(StopStrategyKind::AtrDynamic),
            ExitKind::TimeStop,
            ExitKind::ProfitTarget,
            ExitKind::TrailStop,
            ExitKind::Signal("distribution_warning".into()),
            ExitKind::EndOfData,
        ];
        for kind in kinds {
            assert_eq!(ExitKind::parse(&kind.label()), Some(kind.clone()));
        }
        assert_eq!(ExitKind::parse("STATIC_STOP"), None);
        assert_eq!(ExitKind::parse("MOON"), None);
    }

    #[test]
    fn stop_kinds() {
        assert!(ExitKind::HardStop.is_stop());
        assert!(ExitKind::StrategyStop(StopStrategyKind::AtrDynamic).is_stop());
        assert!(!ExitKind::TimeStop.is_stop());
        assert!(!ExitKind::TrailStop.is_stop());
    }

    #[test]
    fn exit_kind_serializes_as_label() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        assert!(json.contains(r#""exit_kind":"PROFIT_TARGET""#));
        let deser: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.exit_kind, ExitKind::ProfitTarget);
        assert_eq!(deser.quantity, 100);
    }

    #[test]
    fn winner_and_final() {
        let mut trade = sample_trade();
        assert!(trade.is_winner());
        assert!(!trade.is_final());
        trade.is_partial = false;
        trade.dollar_pnl = -5.0;
        assert!(trade.is_final());
        assert!(!trade.is_winner());
    }
}
