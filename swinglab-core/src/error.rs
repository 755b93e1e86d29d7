//! Engine error taxonomy.
//!
//! Per-trade errors are recoverable: the caller skips the entry attempt and the
//! simulation continues. Configuration errors are raised at construction time,
//! before the first bar. Ledger misuse is a programming error.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid stop: stop {stop_price} must be below entry {entry_price}")]
    InvalidStop { entry_price: f64, stop_price: f64 },

    #[error("position size rounds to zero (risk ${risk_amount:.2}, risk per share ${risk_per_unit:.4})")]
    ZeroSize { risk_amount: f64, risk_per_unit: f64 },

    #[error("account equity depleted: equity {equity}, risk budget {risk_amount}")]
    DepletedEquity { equity: f64, risk_amount: f64 },

    #[error("unsupported stop strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("position already open for {0}")]
    DuplicatePosition(String),

    #[error("no open position for {0}")]
    UnknownPosition(String),

    #[error("missing indicator '{field}' for {symbol} on {date}")]
    MissingIndicator {
        field: &'static str,
        symbol: String,
        date: NaiveDate,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// True for errors that only invalidate a single entry attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidStop { .. }
                | EngineError::ZeroSize { .. }
                | EngineError::MissingIndicator { .. }
                | EngineError::DepletedEquity { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_trade_errors_are_recoverable() {
        assert!(EngineError::InvalidStop {
            entry_price: 100.0,
            stop_price: 101.0
        }
        .is_recoverable());
        assert!(EngineError::ZeroSize {
            risk_amount: 1.0,
            risk_per_unit: 5.0
        }
        .is_recoverable());
        assert!(EngineError::MissingIndicator {
            field: "atr",
            symbol: "SPY".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
        .is_recoverable());
    }

    #[test]
    fn config_and_ledger_errors_are_fatal() {
        assert!(!EngineError::UnsupportedStrategy("chandelier".into()).is_recoverable());
        assert!(!EngineError::DuplicatePosition("SPY".into()).is_recoverable());
        assert!(!EngineError::UnknownPosition("SPY".into()).is_recoverable());
        assert!(!EngineError::InvalidConfig("bad".into()).is_recoverable());
    }

    #[test]
    fn missing_indicator_message_names_field() {
        let err = EngineError::MissingIndicator {
            field: "anchored_vwap",
            symbol: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("anchored_vwap"));
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("2024-03-01"));
    }
}
