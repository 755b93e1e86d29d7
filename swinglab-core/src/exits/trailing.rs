//! Post-target trailing stop level.
//!
//! After the profit target is taken, the remainder trails the lowest close of
//! the recent lookback window. The window is the `lookback` bars preceding the
//! current bar (fewer if the series is shorter), so a close below it is a
//! genuine break of the recent range.

use crate::domain::Bar;

/// Lowest close over the `lookback` bars before the last bar of `history`.
///
/// Returns `None` when there is no preceding bar.
pub fn window_min_close(history: &[Bar], lookback: usize) -> Option<f64> {
    let current = history.len().checked_sub(1)?;
    let start = current.saturating_sub(lookback);
    history[start..current]
        .iter()
        .map(|b| b.close)
        .filter(|c| c.is_finite())
        .reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new("SPY", start + Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn excludes_current_bar() {
        let bars = series(&[105.0, 103.0, 104.0, 90.0]);
        assert_eq!(window_min_close(&bars, 10), Some(103.0));
    }

    #[test]
    fn respects_lookback() {
        let bars = series(&[90.0, 103.0, 104.0, 106.0, 107.0]);
        assert_eq!(window_min_close(&bars, 3), Some(103.0));
        assert_eq!(window_min_close(&bars, 4), Some(90.0));
    }

    #[test]
    fn short_history_uses_all_bars() {
        let bars = series(&[101.0, 99.0, 100.0]);
        assert_eq!(window_min_close(&bars, 10), Some(99.0));
    }

    #[test]
    fn no_preceding_bar() {
        assert_eq!(window_min_close(&series(&[100.0]), 10), None);
        assert_eq!(window_min_close(&[], 10), None);
    }
}
