//! SwingLab Core — stop strategies, position sizing and the exit state machine
//! for long swing trades.
//!
//! This crate holds everything that happens to a single position:
//! - Domain types (bars with precomputed indicators, positions, trade records)
//! - Fixed-fractional position sizing
//! - Initial stop placement and five ratcheting stop strategies
//! - The per-bar exit evaluator (stops, signals, time stop, scale-out, trail)
//! - Account equity and the position ledger
//!
//! Bar iteration across instruments lives in `swinglab-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod exits;
pub mod sizers;
pub mod stops;

pub use domain::{Bar, ExitKind, Position, TradeRecord};
pub use engine::{AccountState, ExitOrder, PositionLedger};
pub use error::{EngineError, Result};
pub use exits::{ExitDecision, ExitEvaluator, ExitRules};
pub use sizers::PositionSizer;
pub use stops::{InitialStopParams, StopParams, StopStrategy, StopStrategyKind};
