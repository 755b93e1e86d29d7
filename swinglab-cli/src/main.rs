//! SwingLab CLI — run a backtest or compare stop strategies.
//!
//! Commands:
//! - `run`: one backtest from a TOML config over a JSON bar file
//! - `compare`: the same backtest under several stop strategies
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); reports go to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use swinglab_runner::{
    all_strategy_tags, compare_stop_strategies, load_bars, run_backtest, BacktestConfig,
    BacktestResult, StrategyComparison,
};

#[derive(Parser)]
#[command(
    name = "swinglab",
    about = "SwingLab CLI — stop, sizing and exit lifecycle backtests for swing trades"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest.
    Run {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON file of bars: an array of bars or an object keyed by symbol.
        #[arg(long)]
        bars: PathBuf,

        /// Override the configured stop strategy.
        #[arg(long)]
        strategy: Option<String>,

        /// Write the full result as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the same backtest under several stop strategies in parallel.
    Compare {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON file of bars: an array of bars or an object keyed by symbol.
        #[arg(long)]
        bars: PathBuf,

        /// Strategies to compare. Defaults to all of them.
        #[arg(long = "strategy")]
        strategies: Vec<String>,

        /// Write the comparison as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bars,
            strategy,
            output,
        } => run_cmd(config.as_deref(), &bars, strategy.as_deref(), output.as_deref()),
        Commands::Compare {
            config,
            bars,
            strategies,
            output,
        } => compare_cmd(config.as_deref(), &bars, strategies, output.as_deref()),
    }
}

fn run_cmd(
    config_path: Option<&Path>,
    bars_path: &Path,
    strategy: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(tag) = strategy {
        config = config.with_stop_strategy(tag);
    }
    let data = load_bars(bars_path)
        .with_context(|| format!("loading bars from {}", bars_path.display()))?;

    let result = run_backtest(&config, &data).context("backtest failed")?;
    print_summary(&result);

    if let Some(path) = output {
        write_json(path, &result)?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

fn compare_cmd(
    config_path: Option<&Path>,
    bars_path: &Path,
    strategies: Vec<String>,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let data = load_bars(bars_path)
        .with_context(|| format!("loading bars from {}", bars_path.display()))?;
    let strategies = if strategies.is_empty() {
        all_strategy_tags()
    } else {
        strategies
    };

    let rows = compare_stop_strategies(&config, &data, &strategies).context("comparison failed")?;
    print_comparison(&rows);

    if let Some(path) = output {
        write_json(path, &rows)?;
        println!("Comparison saved to: {}", path.display());
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(p) => BacktestConfig::load(p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!("Run ID:         {}", result.run_id);
    println!("Stop Strategy:  {}", result.stop_strategy);
    println!("Bars:           {}", result.bar_count);
    println!("Round Trips:    {} ({} records)", s.round_trips, s.record_count);
    println!("Skipped:        {}", result.skipped_entries.len());
    if result.entries_halted {
        println!("Entries halted: equity depleted");
    }
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", result.final_equity);
    println!("Total Return:   {:.2}%", s.total_return_pct);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown_pct);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Avg R:          {:.2}", s.avg_r);
    println!("Total R:        {:.2}", s.total_r);
    println!("Expectancy:     {:.2}", s.expectancy);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Avg Bars Held:  {:.1}", s.avg_bars_held);
    if !s.exits_by_kind.is_empty() {
        println!();
        println!("--- Exits ---");
        for (kind, count) in &s.exits_by_kind {
            println!("{kind:<22}{count}");
        }
    }
}

fn print_comparison(rows: &[StrategyComparison]) {
    println!();
    println!(
        "{:<14}{:>8}{:>10}{:>10}{:>10}{:>14}",
        "strategy", "trips", "win%", "avg R", "max DD%", "final equity"
    );
    for r in rows {
        println!(
            "{:<14}{:>8}{:>10.1}{:>10.2}{:>10.2}{:>14.2}",
            r.stop_strategy,
            r.summary.round_trips,
            r.summary.win_rate * 100.0,
            r.summary.avg_r,
            r.summary.max_drawdown_pct,
            r.final_equity
        );
    }
}
