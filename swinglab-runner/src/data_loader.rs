//! Bar loading — JSON in, per-symbol series out.
//!
//! Accepts either a flat array of bars (each carrying its `symbol`) or an
//! object keyed by symbol. Series order is preserved; the runner checks that
//! dates are strictly increasing.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use swinglab_core::Bar;

/// Bar series per symbol, in lexical symbol order.
pub type BarsBySymbol = BTreeMap<String, Vec<Bar>>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bars {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse bars: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bar keyed under '{key}' belongs to '{symbol}'")]
    SymbolMismatch { key: String, symbol: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BarFile {
    Flat(Vec<Bar>),
    Keyed(BTreeMap<String, Vec<Bar>>),
}

/// Group a flat list of bars by symbol, keeping per-symbol order.
pub fn group_bars(bars: Vec<Bar>) -> BarsBySymbol {
    let mut grouped = BarsBySymbol::new();
    for bar in bars {
        grouped.entry(bar.symbol.clone()).or_default().push(bar);
    }
    grouped
}

pub fn parse_bars(json: &str) -> Result<BarsBySymbol, LoadError> {
    match serde_json::from_str::<BarFile>(json)? {
        BarFile::Flat(bars) => Ok(group_bars(bars)),
        BarFile::Keyed(map) => {
            for (key, series) in &map {
                if let Some(bar) = series.iter().find(|b| &b.symbol != key) {
                    return Err(LoadError::SymbolMismatch {
                        key: key.clone(),
                        symbol: bar.symbol.clone(),
                    });
                }
            }
            Ok(map)
        }
    }
}

pub fn load_bars(path: &Path) -> Result<BarsBySymbol, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bars(&text)
}
