//! CLI entry point for the allocbook rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use allocbook::Holdings;
use allocbook_feeds::PriceSource;
use allocbook_feeds::snapshot::SnapshotSource;
use allocbook_rebalancer::config::{Config, SourceKind};
use allocbook_rebalancer::error::{Error, Result};
use allocbook_rebalancer::execution::{self, RunOptions};
use allocbook_rebalancer::explain::Summarizer;
use allocbook_rebalancer::openai::OpenAiSummarizer;
use allocbook_rebalancer::portfolio::{HoldingsStore, JsonPortfolioStore};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Mean-variance portfolio rebalancer (dry run only)")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read market data from a snapshot file instead of the configured source
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Override [history] lookback
    #[arg(long, global = true)]
    lookback: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize, plan trades, and explain them
    Run {
        /// Path to portfolio.json
        portfolio: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Skip the natural-language explanation
        #[arg(long)]
        no_explain: bool,

        /// Override [optimizer] risk_aversion
        #[arg(long)]
        risk_aversion: Option<f64>,
    },

    /// Show target weights only
    Weights {
        /// Path to portfolio.json
        portfolio: PathBuf,
    },

    /// Show current values and weights
    Positions {
        /// Path to portfolio.json
        portfolio: PathBuf,
    },

    /// Save quotes and histories for later offline runs
    Snapshot {
        /// Path to portfolio.json
        portfolio: PathBuf,

        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref().map(Config::load).transpose() {
        Ok(c) => c.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };
    if let Some(path) = &cli.snapshot {
        config.data.source = SourceKind::Snapshot;
        config.data.snapshot = Some(path.clone());
    }
    if let Some(lookback) = cli.lookback {
        config.history.lookback = lookback;
    }
    if let Command::Run {
        risk_aversion: Some(ra),
        ..
    } = &cli.command
    {
        config.optimizer.risk_aversion = *ra;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    if let Err(e) = dispatch(cli.command, &config) {
        eprintln!("Error: {e}");
        if e.is_rebalance_abort() {
            process::exit(2);
        }
        process::exit(1);
    }
}

fn dispatch(command: Command, config: &Config) -> Result<()> {
    let (source, source_name) = build_source(config)?;

    match command {
        Command::Run {
            portfolio,
            json,
            no_explain,
            ..
        } => {
            let holdings = load_holdings(&portfolio)?;
            let summarizer: Option<Box<dyn Summarizer>> =
                if config.summarizer.enabled && !no_explain {
                    Some(Box::new(OpenAiSummarizer::from_config(&config.summarizer)?))
                } else {
                    None
                };
            let opts = RunOptions {
                json,
                portfolio_file: portfolio.display().to_string(),
                source_name,
            };
            execution::run(config, &holdings, &source, summarizer.as_deref(), &opts)
        }
        Command::Weights { portfolio } => {
            let holdings = load_holdings(&portfolio)?;
            execution::show_weights(config, &holdings, &source)
        }
        Command::Positions { portfolio } => {
            let holdings = load_holdings(&portfolio)?;
            execution::show_positions(&holdings, &source)
        }
        Command::Snapshot { portfolio, out } => {
            let holdings = load_holdings(&portfolio)?;
            execution::capture_snapshot(config, &holdings, &source, &out).map(|_| ())
        }
    }
}

fn load_holdings(path: &Path) -> Result<Holdings> {
    JsonPortfolioStore::new(path).load_holdings()
}

fn build_source(config: &Config) -> Result<(Box<dyn PriceSource>, String)> {
    match config.data.source {
        SourceKind::Snapshot => {
            let path = config
                .data
                .snapshot
                .as_deref()
                .ok_or_else(|| Error::Config("no snapshot file configured".into()))?;
            let source = SnapshotSource::load(path)?;
            Ok((Box::new(source), format!("snapshot:{}", path.display())))
        }
        #[cfg(feature = "yahoo")]
        SourceKind::Yahoo => {
            let source = allocbook_feeds::yahoo::YahooSource::new()?;
            Ok((Box::new(source), "yahoo".into()))
        }
        #[cfg(not(feature = "yahoo"))]
        SourceKind::Yahoo => Err(Error::Config(
            "built without Yahoo support; use a snapshot source".into(),
        )),
    }
}
