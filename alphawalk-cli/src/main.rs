//! AlphaWalk CLI — backtest, train/test search and walk-forward commands.
//!
//! Commands:
//! - `backtest` — simulate fixed parameters over the full series, print metrics
//! - `search` — search on the train side of `[split]`, confirm on the test side
//! - `walk-forward` — rolling optimization, stability summary and artifacts

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use alphawalk_core::domain::{BarSeries, ExpirationCalendar};
use alphawalk_core::simulator::Simulator;
use alphawalk_runner::export::{metrics_summary, save_walk_forward, stability_summary, write_json};
use alphawalk_runner::{
    load_bars, load_expirations, Backtester, Experiment, ExperimentConfig, ParamSearch,
    WalkForwardOptimizer,
};

#[derive(Parser)]
#[command(
    name = "alphawalk",
    about = "AlphaWalk — intraday strategy search and walk-forward optimization"
)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate fixed parameters over the whole series.
    Backtest {
        /// Experiment TOML file.
        #[arg(long)]
        config: PathBuf,

        /// Write the full result (positions, forced exits, metrics) as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Search parameters on the train split and evaluate them on the test split.
    Search {
        /// Experiment TOML file with a [split] section.
        #[arg(long)]
        config: PathBuf,

        /// Write the search outcome as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Rolling train/test optimization over the whole series.
    WalkForward {
        /// Experiment TOML file with a [walk_forward] section.
        #[arg(long)]
        config: PathBuf,

        /// Directory for walk_forward.json and windows.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Backtest { config, output } => run_backtest(&config, output.as_deref()),
        Commands::Search { config, output } => run_search(&config, output.as_deref()),
        Commands::WalkForward { config, output_dir } => run_walk_forward(&config, &output_dir),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Validated experiment plus its data.
struct Loaded {
    experiment: Experiment,
    series: BarSeries,
    calendar: ExpirationCalendar,
}

fn load(config_path: &Path) -> Result<Loaded> {
    let experiment = ExperimentConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?
        .validate()
        .context("invalid experiment configuration")?;

    let loaded = load_bars(&experiment.bars_path)
        .with_context(|| format!("failed to load bars from {}", experiment.bars_path.display()))?;
    let calendar = match &experiment.expirations_path {
        Some(path) => load_expirations(path)
            .with_context(|| format!("failed to load expirations from {}", path.display()))?,
        None => ExpirationCalendar::new(),
    };
    info!(
        bars = loaded.series.len(),
        dropped = loaded.dropped_rows,
        first = %loaded.series.first_timestamp(),
        last = %loaded.series.last_timestamp(),
        expirations = calendar.len(),
        strategy = experiment.strategy.name(),
        "data loaded"
    );

    Ok(Loaded {
        experiment,
        series: loaded.series,
        calendar,
    })
}

fn backtester<'a>(experiment: &'a Experiment, calendar: &'a ExpirationCalendar) -> Backtester<'a> {
    Backtester::new(
        &experiment.strategy,
        Simulator::new(experiment.session, calendar),
        &experiment.evaluator,
    )
}

fn run_backtest(config: &Path, output: Option<&Path>) -> Result<()> {
    let Loaded {
        experiment,
        series,
        calendar,
    } = load(config)?;
    let params = experiment
        .search
        .space
        .fixed_assignment()
        .context("backtest needs fixed values for every [strategy.params] entry")?;

    let result = backtester(&experiment, &calendar).run(&params, series.bars())?;
    println!("strategy: {} {}", result.strategy, result.params);
    println!(
        "bars: {}, forced exits: {}",
        result.bar_count,
        result.forced_exits.len()
    );
    print!("{}", metrics_summary(&result.metrics));

    if let Some(path) = output {
        write_json(&result, path)?;
        println!("result written to {}", path.display());
    }
    Ok(())
}

fn run_search(config: &Path, output: Option<&Path>) -> Result<()> {
    let Loaded {
        experiment,
        series,
        calendar,
    } = load(config)?;
    let Some(split) = experiment.split else {
        bail!("search needs a [split] section in {}", config.display());
    };

    let outcome =
        ParamSearch::new(backtester(&experiment, &calendar), &experiment.search).run(&series, &split)?;
    let failed = outcome.trials.iter().filter(|t| !t.is_complete()).count();
    println!("strategy: {}", outcome.strategy);
    println!("trials: {} ({} failed)", outcome.trials.len(), failed);
    println!("best params: {}", outcome.best_params);
    println!("train objective: {:?}", outcome.train_values);
    println!("test objective:  {:?}", outcome.test_values);
    println!("\n[train]");
    print!("{}", metrics_summary(&outcome.train_metrics));
    println!("\n[test]");
    print!("{}", metrics_summary(&outcome.test_metrics));

    if let Some(path) = output {
        write_json(&outcome, path)?;
        println!("outcome written to {}", path.display());
    }
    Ok(())
}

fn run_walk_forward(config: &Path, output_dir: &Path) -> Result<()> {
    let Loaded {
        experiment,
        series,
        calendar,
    } = load(config)?;
    let Some(wf) = experiment.walk_forward.clone() else {
        bail!("walk-forward needs a [walk_forward] section in {}", config.display());
    };

    let optimizer = WalkForwardOptimizer::new(
        backtester(&experiment, &calendar),
        experiment.search.space.clone(),
        experiment.search.targets.clone(),
        experiment.search.directions.clone(),
        wf,
    );
    let report = optimizer.run(&series)?;
    print!("{}", stability_summary(&report));

    let written = save_walk_forward(&report, output_dir)?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}
