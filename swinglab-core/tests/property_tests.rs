//! Property tests for lifecycle invariants.
//!
//! Uses proptest to verify:
//! 1. Stop monotonicity: for every strategy, stops never loosen on any path
//! 2. Sizing: quantity is whole, non-zero, and never risks more than the budget
//! 3. Partial conservation: exit fractions of a position sum to 1
//! 4. R identity: trade R-multiple matches the price move over initial risk
//! 5. Entry bar: evaluation on the entry bar never changes the position

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use swinglab_core::sizers::size;
use swinglab_core::{
    AccountState, Bar, EngineError, ExitDecision, ExitEvaluator, ExitKind, ExitOrder, ExitRules,
    PositionLedger, PositionSizer, StopParams, StopStrategy, StopStrategyKind,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_equity() -> impl Strategy<Value = f64> {
    (1_000.0..1_000_000.0_f64).prop_map(|e| e.round())
}

fn arb_risk_pct() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.1), Just(0.5), Just(1.0), Just(2.0), Just(5.0)]
}

/// Daily close path as multiplicative steps from 100.
fn arb_path() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.06..0.06_f64, 5..60).prop_map(|steps| {
        let mut price = 100.0;
        let mut closes = vec![price];
        for s in steps {
            price *= 1.0 + s;
            closes.push((price * 100.0).round() / 100.0);
        }
        closes
    })
}

fn arb_bar_indicators() -> impl Strategy<Value = (f64, f64)> {
    (0.5..6.0_f64, -3.0..3.0_f64)
}

fn arb_strategy() -> impl Strategy<Value = StopStrategy> {
    prop::sample::select(StopStrategyKind::ALL.to_vec())
        .prop_map(|k| StopStrategy::with_params(k, &StopParams::default()))
}

fn make_bars(closes: &[f64], indicators: &[(f64, f64)]) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let (atr, z) = indicators[i % indicators.len()];
            Bar::new("SPY", start + Duration::days(i as i64), c)
                .with_atr(atr)
                .with_vol_zscore(z)
        })
        .collect()
}

// ── 1. Stop monotonicity ─────────────────────────────────────────────

proptest! {
    /// The protective stop never decreases bar over bar, whatever the strategy,
    /// path or indicator values. Neither does the trailing stop once set.
    #[test]
    fn stops_never_loosen(
        strategy in arb_strategy(),
        closes in arb_path(),
        indicators in prop::collection::vec(arb_bar_indicators(), 1..10),
    ) {
        let ev = ExitEvaluator::new(strategy, ExitRules::default()).unwrap();
        let bars = make_bars(&closes, &indicators);
        let mut account = AccountState::new(100_000.0);
        let mut ledger = PositionLedger::new(PositionSizer::new(1.0).unwrap(), strategy.kind());
        ledger.open("SPY", bars[0].date, 100.0, 95.0, 0, &account).unwrap();

        let mut last_stop = 95.0;
        let mut last_trail: Option<f64> = None;
        for i in 1..bars.len() {
            let d = ledger.update(&ev, "SPY", &bars[..=i], None).unwrap();
            let pos = ledger.get("SPY").unwrap();
            prop_assert!(pos.stop_price >= last_stop);
            if let (Some(prev), Some(now)) = (last_trail, pos.trailing_stop_price) {
                prop_assert!(now >= prev);
            }
            last_stop = pos.stop_price;
            last_trail = pos.trailing_stop_price;

            if let Some(order) = ExitOrder::from_decision(&d, &bars[i], i) {
                ledger.close(&mut account, "SPY", order).unwrap();
                if !ledger.is_open("SPY") {
                    break;
                }
            }
        }
    }
}

// ── 2. Sizing ────────────────────────────────────────────────────────

proptest! {
    /// A successful size risks at most the budget and one more share would exceed it.
    #[test]
    fn size_respects_risk_budget(
        entry in arb_price(),
        stop_frac in 0.5..0.99_f64,
        equity in arb_equity(),
        risk_pct in arb_risk_pct(),
    ) {
        let stop = (entry * stop_frac * 100.0).round() / 100.0;
        prop_assume!(stop < entry);
        let budget = equity * risk_pct / 100.0;
        let per_unit = entry - stop;
        match size(entry, stop, equity, risk_pct) {
            Ok(qty) => {
                prop_assert!(qty >= 1);
                prop_assert_eq!(qty, (budget / per_unit).floor() as u64);
                prop_assert!(qty as f64 * per_unit <= budget + 1e-6);
                prop_assert!((qty + 1) as f64 * per_unit > budget - 1e-6);
            }
            Err(EngineError::ZeroSize { .. }) => prop_assert!(per_unit > budget),
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// A stop at or above entry is always rejected.
    #[test]
    fn size_rejects_stop_not_below_entry(
        entry in arb_price(),
        above in 0.0..50.0_f64,
        equity in arb_equity(),
    ) {
        let result = size(entry, entry + above, equity, 1.0);
        let is_invalid_stop = matches!(result, Err(EngineError::InvalidStop { .. }));
        prop_assert!(is_invalid_stop);
    }
}

// ── 3 & 4. Partial conservation and R identity ───────────────────────

proptest! {
    /// However a position is closed, its exit fractions sum to 1, its exited
    /// quantities sum to the original quantity, and each leg's R equals
    /// `(exit - entry) / (entry - initial_stop)`.
    #[test]
    fn exits_conserve_quantity_and_r(
        strategy in arb_strategy(),
        closes in arb_path(),
        indicators in prop::collection::vec(arb_bar_indicators(), 1..10),
    ) {
        let ev = ExitEvaluator::new(strategy, ExitRules::default()).unwrap();
        let bars = make_bars(&closes, &indicators);
        let mut account = AccountState::new(100_000.0);
        let mut ledger = PositionLedger::new(PositionSizer::new(1.0).unwrap(), strategy.kind());
        let original = ledger.open("SPY", bars[0].date, 100.0, 95.0, 0, &account).unwrap().quantity;

        let last = bars.len() - 1;
        for i in 1..=last {
            let d = ledger.update(&ev, "SPY", &bars[..=i], None).unwrap();
            if let Some(order) = ExitOrder::from_decision(&d, &bars[i], i) {
                ledger.close(&mut account, "SPY", order).unwrap();
                if !ledger.is_open("SPY") {
                    break;
                }
            }
        }
        if ledger.is_open("SPY") {
            let bar = &bars[last];
            let order = ExitOrder::full(ExitKind::EndOfData, bar.close, bar.date, last);
            ledger.close(&mut account, "SPY", order).unwrap();
        }

        prop_assert!(!ledger.is_open("SPY"));
        let trades = ledger.trades();
        let fractions: f64 = trades.iter().map(|t| t.exit_fraction).sum();
        let shares: u64 = trades.iter().map(|t| t.quantity).sum();
        prop_assert!((fractions - 1.0).abs() < 1e-9);
        prop_assert_eq!(shares, original);
        prop_assert!(trades.last().unwrap().is_final());
        for t in trades {
            let expected = (t.exit_price - t.entry_price) / (t.entry_price - t.initial_stop_price);
            prop_assert!((t.leg_r_multiple - expected).abs() < 1e-9);
        }

        let pnl: f64 = trades.iter().map(|t| t.dollar_pnl).sum();
        prop_assert!((account.current_equity() - 100_000.0 - pnl).abs() < 1e-6);
    }
}

// ── 5. Entry bar ─────────────────────────────────────────────────────

proptest! {
    /// Evaluating on the entry bar holds and leaves every field untouched.
    #[test]
    fn entry_bar_is_noop(
        strategy in arb_strategy(),
        close in arb_price(),
        (atr, z) in arb_bar_indicators(),
    ) {
        let ev = ExitEvaluator::new(strategy, ExitRules::default()).unwrap();
        let bar = Bar::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), close)
            .with_atr(atr)
            .with_vol_zscore(z);
        let account = AccountState::new(100_000.0);
        let mut ledger = PositionLedger::new(PositionSizer::new(1.0).unwrap(), strategy.kind());
        ledger.open("SPY", bar.date, 100.0, 95.0, 0, &account).unwrap();
        let before = serde_json::to_string(ledger.get("SPY").unwrap()).unwrap();

        let d = ledger.update(&ev, "SPY", std::slice::from_ref(&bar), Some("exit")).unwrap();
        prop_assert_eq!(d, ExitDecision::Hold);
        let after = serde_json::to_string(ledger.get("SPY").unwrap()).unwrap();
        prop_assert_eq!(before, after);
    }
}
