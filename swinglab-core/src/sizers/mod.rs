//! Position Sizers — determine trade quantity
//!
//! Sizers translate a risk budget into a whole-share quantity. They are
//! account-aware (use current equity) but signal-agnostic.

pub mod fixed_risk;

pub use fixed_risk::{size, PositionSizer};
