//! Stop strategy comparison — the same data under several stop strategies.
//!
//! Each strategy gets its own account and ledger, so runs are independent and
//! execute on the rayon pool. Results come back in the order requested.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use swinglab_core::{Bar, StopStrategyKind};

use crate::config::{BacktestConfig, RunId};
use crate::metrics::LedgerSummary;
use crate::runner::{run_backtest, RunError};

/// One row of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub stop_strategy: String,
    pub run_id: RunId,
    pub summary: LedgerSummary,
    pub final_equity: f64,
    pub skipped_entries: usize,
}

/// Every built-in stop strategy tag.
pub fn all_strategy_tags() -> Vec<String> {
    StopStrategyKind::ALL
        .iter()
        .map(|k| k.name().to_string())
        .collect()
}

/// Run `base` once per tag in `strategies`, in parallel.
///
/// Any failing run fails the whole comparison; an unknown tag is reported as
/// a config error before any bar is processed for it.
pub fn compare_stop_strategies(
    base: &BacktestConfig,
    data: &BTreeMap<String, Vec<Bar>>,
    strategies: &[String],
) -> Result<Vec<StrategyComparison>, RunError> {
    info!(strategies = strategies.len(), "comparing stop strategies");

    strategies
        .par_iter()
        .map(|tag| {
            let result = run_backtest(&base.with_stop_strategy(tag), data)?;
            Ok(StrategyComparison {
                stop_strategy: result.stop_strategy,
                run_id: result.run_id,
                summary: result.summary,
                final_equity: result.final_equity,
                skipped_entries: result.skipped_entries.len(),
            })
        })
        .collect::<Result<Vec<_>, RunError>>()
}
