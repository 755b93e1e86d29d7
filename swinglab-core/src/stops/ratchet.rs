//! Ratchet invariant enforcement
//!
//! **Core Rule:** a long stop may tighten (rise), never loosen (fall), even
//! when ATR expands or a strategy's raw candidate drops.
//!
//! Stop strategies emit raw candidates; the position applies this clamp.

/// Clamp a proposed long stop against the current level.
///
/// Returns `max(current, proposed)`. A non-finite proposal leaves the stop
/// unchanged.
///
/// # Example
/// ```
/// use swinglab_core::stops::ratchet::ratchet_long;
///
/// // Tightening: $95 -> $100 (allowed)
/// assert_eq!(ratchet_long(100.0, 95.0), 100.0);
///
/// // Loosening: $100 -> $90 (blocked, stays at $100)
/// assert_eq!(ratchet_long(90.0, 100.0), 100.0);
/// ```
pub fn ratchet_long(proposed: f64, current: f64) -> f64 {
    if proposed.is_finite() {
        current.max(proposed)
    } else {
        current
    }
}
