//! Fixed-Risk Sizer
//!
//! Risk a fixed percentage of current equity between the entry and the
//! initial stop. Quantity is always a whole number of shares.

use crate::error::{EngineError, Result};

/// Fixed fractional risk sizer
///
/// # Formula
/// ```text
/// risk_amount   = equity * risk_pct / 100
/// risk_per_unit = entry_price - stop_price
/// quantity      = floor(risk_amount / risk_per_unit)
/// ```
///
/// # Example
/// - Equity: $100,000
/// - Risk per trade: 1% ($1,000)
/// - Entry $100, stop $95 (risk per share $5)
/// - Quantity: floor($1,000 / $5) = 200 shares
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    /// Risk per trade in percent of equity (1.0 = 1%).
    risk_pct: f64,
}

impl PositionSizer {
    pub fn new(risk_pct: f64) -> Result<Self> {
        if !risk_pct.is_finite() || risk_pct <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "risk_pct must be positive, got {risk_pct}"
            )));
        }
        Ok(Self { risk_pct })
    }

    pub fn risk_pct(&self) -> f64 {
        self.risk_pct
    }

    /// Size a long entry against the given equity.
    pub fn size(&self, entry_price: f64, stop_price: f64, equity: f64) -> Result<u64> {
        size(entry_price, stop_price, equity, self.risk_pct)
    }
}

/// Whole-share quantity for a long entry. Pure.
///
/// # Errors
/// - [`EngineError::InvalidStop`] if `stop_price >= entry_price`
/// - [`EngineError::DepletedEquity`] if the risk budget is not positive
/// - [`EngineError::ZeroSize`] if the floored quantity is zero
pub fn size(entry_price: f64, stop_price: f64, equity: f64, risk_pct: f64) -> Result<u64> {
    // Negated comparison so NaN prices are rejected too.
    if !(stop_price < entry_price) {
        return Err(EngineError::InvalidStop {
            entry_price,
            stop_price,
        });
    }

    let risk_amount = equity * risk_pct / 100.0;
    if !(risk_amount > 0.0) {
        return Err(EngineError::DepletedEquity {
            equity,
            risk_amount,
        });
    }

    let risk_per_unit = entry_price - stop_price;
    let quantity = (risk_amount / risk_per_unit).floor();
    if quantity < 1.0 {
        return Err(EngineError::ZeroSize {
            risk_amount,
            risk_per_unit,
        });
    }

    Ok(quantity as u64)
}
