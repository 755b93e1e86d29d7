//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! account_value = 100000.0
//! risk_pct_per_trade = 1.0
//! stop_strategy = "vol_regime"
//! time_stop_bars = 20
//!
//! [stop_params.vol_regime]
//! high_mult = 3.5
//!
//! [exit_rules]
//! profit_target_r = 2.0
//!
//! [initial_stop]
//! swing_atr_buffer = 0.5
//! ```
//!
//! Every table is optional and falls back to its defaults field by field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use swinglab_core::{
    EngineError, ExitEvaluator, ExitRules, InitialStopParams, PositionSizer, StopParams,
    StopStrategy,
};

/// Content hash identifying a configuration.
pub type RunId = String;

/// Allowed range for `risk_pct_per_trade`, in percent of equity.
pub const RISK_PCT_RANGE: (f64, f64) = (0.1, 5.0);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting account equity in dollars.
    pub account_value: f64,
    /// Risk per trade in percent of current equity.
    pub risk_pct_per_trade: f64,
    /// Stop strategy tag: `static`, `vol_regime`, `atr_dynamic`, `pct_trail`, `time_decay`.
    pub stop_strategy: String,
    /// Overrides `exit_rules.time_stop_bars` when set.
    pub time_stop_bars: Option<usize>,
    pub stop_params: StopParams,
    pub exit_rules: ExitRules,
    pub initial_stop: InitialStopParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            account_value: 100_000.0,
            risk_pct_per_trade: 1.0,
            stop_strategy: "static".into(),
            time_stop_bars: None,
            stop_params: StopParams::default(),
            exit_rules: ExitRules::default(),
            initial_stop: InitialStopParams::default(),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Copy of this config running a different stop strategy.
    pub fn with_stop_strategy(&self, tag: &str) -> Self {
        Self {
            stop_strategy: tag.to_string(),
            ..self.clone()
        }
    }

    /// Check every field before the first bar is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.account_value.is_finite() && self.account_value > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "account_value must be positive, got {}",
                self.account_value
            )));
        }
        let (lo, hi) = RISK_PCT_RANGE;
        if !(self.risk_pct_per_trade >= lo && self.risk_pct_per_trade <= hi) {
            return Err(ConfigError::Invalid(format!(
                "risk_pct_per_trade must be in [{lo}, {hi}], got {}",
                self.risk_pct_per_trade
            )));
        }
        let buffers = [
            ("initial_stop.swing_atr_buffer", self.initial_stop.swing_atr_buffer),
            ("initial_stop.vwap_atr_buffer", self.initial_stop.vwap_atr_buffer),
        ];
        for (name, value) in buffers {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        self.stop_strategy()?;
        self.exit_rules().validate()?;
        Ok(())
    }

    /// The configured stop strategy. Fails on an unknown tag.
    pub fn stop_strategy(&self) -> Result<StopStrategy, ConfigError> {
        Ok(StopStrategy::from_tag(&self.stop_strategy, &self.stop_params)?)
    }

    /// Exit rules with the top-level `time_stop_bars` override applied.
    pub fn exit_rules(&self) -> ExitRules {
        ExitRules {
            time_stop_bars: self
                .time_stop_bars
                .unwrap_or(self.exit_rules.time_stop_bars),
            ..self.exit_rules
        }
    }

    pub fn evaluator(&self) -> Result<ExitEvaluator, ConfigError> {
        Ok(ExitEvaluator::new(self.stop_strategy()?, self.exit_rules())?)
    }

    pub fn sizer(&self) -> Result<PositionSizer, ConfigError> {
        Ok(PositionSizer::new(self.risk_pct_per_trade)?)
    }

    /// Deterministic hash of the canonical JSON form of this config.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
