//! Domain types for SwingLab

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use position::Position;
pub use trade::{ExitKind, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
