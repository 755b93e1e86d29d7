//! Engine state shared across instruments in one backtest run:
//! account equity and the position ledger.

pub mod accounting;
pub mod ledger;

pub use accounting::AccountState;
pub use ledger::{ExitOrder, PositionLedger};
