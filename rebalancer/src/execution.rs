//! Run orchestrator: histories → universe → quotes → plan → explanation.
//!
//! This is the main workflow that ties together all components. Nothing is
//! ever traded; every run is a dry run.

use std::path::Path;

use allocbook::{
    CurrentPrices, Holdings, RebalanceReport, Symbol, Universe, rebalance, resolve_universe,
};
use allocbook_feeds::snapshot::SnapshotSource;
use allocbook_feeds::{PriceSource, fetch_histories};
use log::{info, warn};
use serde::Serialize;

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::Result;
use crate::explain::{EXPLAIN_REQUEST, Summarizer};

/// Options for a rebalance run.
pub struct RunOptions {
    pub json: bool,
    pub portfolio_file: String,
    pub source_name: String,
}

/// What `run --json` prints.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: RebalanceReport,
    pub explanation: Option<String>,
}

/// Open the audit log the config asks for.
pub fn open_audit(config: &Config) -> Result<AuditLog> {
    if config.logging.enabled {
        AuditLog::open(&config.audit_path())
    } else {
        Ok(AuditLog::disabled())
    }
}

/// Phase one: fetch histories for every held symbol and optimize.
pub fn resolve<S: PriceSource + ?Sized>(
    config: &Config,
    holdings: &Holdings,
    source: &S,
) -> Result<Universe> {
    let symbols: Vec<Symbol> = holdings.keys().copied().collect();
    info!("Fetching {} days of history for {} symbols", config.history.lookback, symbols.len());
    let histories = fetch_histories(source, &symbols, config.history.lookback)?;
    Ok(resolve_universe(&histories, &config.rebalance_config())?)
}

/// Compute the report for `holdings`.
///
/// Quotes are requested only for the symbols that survive phase one.
pub fn plan_run<S: PriceSource + ?Sized>(
    config: &Config,
    holdings: &Holdings,
    source: &S,
    audit: &mut AuditLog,
) -> Result<RebalanceReport> {
    let universe = resolve(config, holdings, source)?;
    audit::log_universe(audit, &universe)?;

    let symbols = universe.symbols();
    info!("Fetching current prices for {} symbols", symbols.len());
    let prices = source.current_prices(&symbols)?;

    let report = rebalance(&universe, holdings, &prices, &config.rebalance_config())?;
    for (symbol, reason) in report.skipped() {
        warn!("{symbol}: {reason}");
    }
    audit::log_plan(audit, &report)?;
    Ok(report)
}

/// Ask the summarizer why the plan makes sense.
pub fn explain<M: Summarizer + ?Sized>(
    report: &RebalanceReport,
    summarizer: &M,
    audit: &mut AuditLog,
) -> Result<String> {
    let text = summarizer.summarize(report, EXPLAIN_REQUEST)?;
    audit::log_explanation(audit, &text)?;
    Ok(text)
}

/// Execute a full dry run and print the result.
///
/// Without a summarizer the explanation step is skipped. In text mode the
/// plan is printed before the summarizer is called.
pub fn run<S: PriceSource + ?Sized>(
    config: &Config,
    holdings: &Holdings,
    source: &S,
    summarizer: Option<&dyn Summarizer>,
    opts: &RunOptions,
) -> Result<()> {
    let mut audit = open_audit(config)?;
    audit::log_run_started(
        &mut audit,
        &opts.portfolio_file,
        &opts.source_name,
        config.optimizer.risk_aversion,
        config.history.lookback,
    )?;

    let report = plan_run(config, holdings, source, &mut audit)?;

    if !opts.json {
        print!("{}", format_summary(&report));
        print!("\n{report}");
    }

    let explanation = match summarizer {
        Some(s) => Some(explain(&report, s, &mut audit)?),
        None => None,
    };

    audit::log_run_completed(&mut audit, report.trades().len(), report.skipped().len())?;

    if opts.json {
        let output = RunOutput {
            report,
            explanation,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if let Some(text) = explanation {
            println!("\nExplanation:\n{text}");
        }
        println!("\nDone.");
    }
    Ok(())
}

/// Print target weights only.
pub fn show_weights<S: PriceSource + ?Sized>(
    config: &Config,
    holdings: &Holdings,
    source: &S,
) -> Result<()> {
    let universe = resolve(config, holdings, source)?;
    print!("{}", format_weights(&universe));
    Ok(())
}

/// Print current values and weights.
pub fn show_positions<S: PriceSource + ?Sized>(holdings: &Holdings, source: &S) -> Result<()> {
    let symbols: Vec<Symbol> = holdings.keys().copied().collect();
    let prices = source.current_prices(&symbols)?;
    print!("{}", format_positions(holdings, &prices));
    Ok(())
}

/// Record quotes and histories for every held symbol into a snapshot file.
pub fn capture_snapshot<S: PriceSource + ?Sized>(
    config: &Config,
    holdings: &Holdings,
    source: &S,
    out: &Path,
) -> Result<SnapshotSource> {
    let symbols: Vec<Symbol> = holdings.keys().copied().collect();
    let snapshot = SnapshotSource::capture(source, &symbols, config.history.lookback)?;
    snapshot.save(out)?;
    println!(
        "Saved {} quotes and {} histories to {}",
        snapshot.prices().len(),
        snapshot.histories().len(),
        out.display()
    );
    Ok(snapshot)
}

// === Helpers ===

pub fn format_summary(report: &RebalanceReport) -> String {
    let mut out = format!("Total portfolio value: ${:.2}\n", report.total_value());
    out.push_str(&format!(
        "\nTARGET WEIGHTS (\u{3bb} = {}):\n",
        report.risk_aversion()
    ));
    out.push_str(&format!("  {:8} {:>8} {:>8}\n", "Symbol", "Current", "Target"));
    for (symbol, target) in report.target_weights().iter() {
        let current = report.current_weights().get(&symbol).copied();
        let current = match current {
            Some(w) => format!("{:.1}%", w * 100.0),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "  {:8} {:>8} {:>7.1}%\n",
            symbol,
            current,
            target * 100.0
        ));
    }
    out
}

pub fn format_weights(universe: &Universe) -> String {
    let allocation = universe.allocation();
    let mut out = format!(
        "TARGET WEIGHTS (\u{3bb} = {}, {} rows):\n",
        universe.risk_aversion(),
        universe.history_rows()
    );
    for (symbol, w) in allocation.weights.iter() {
        out.push_str(&format!("  {:8} {:.4}\n", symbol, w));
    }
    out.push_str(&format!(
        "Expected return {:.6}, variance {:.6} per period\n",
        allocation.expected_return, allocation.variance
    ));
    if !universe.dropped().is_empty() {
        out.push_str("\nExcluded:\n");
        for (symbol, reason) in universe.dropped() {
            out.push_str(&format!("  {:8} {}\n", symbol, reason));
        }
    }
    out
}

pub fn format_positions(holdings: &Holdings, prices: &CurrentPrices) -> String {
    if holdings.is_empty() {
        return "No positions.\n".to_string();
    }

    let quoted = |s: &Symbol| prices.get(s).copied().filter(|p| p.is_finite() && *p > 0.0);
    let total: f64 = holdings
        .iter()
        .filter_map(|(s, q)| quoted(s).map(|p| p * q))
        .sum();

    let mut out = String::from("CURRENT PORTFOLIO:\n");
    for (symbol, qty) in holdings {
        match quoted(symbol) {
            Some(price) => {
                let value = price * qty;
                let weight = if total > 0.0 { value / total } else { 0.0 };
                out.push_str(&format!(
                    "  {:8} {:>10} @ ${:>9.2} = ${:>11.2}  ({:.1}%)\n",
                    symbol,
                    qty,
                    price,
                    value,
                    weight * 100.0
                ));
            }
            None => {
                out.push_str(&format!("  {:8} {:>10} (no price)\n", symbol, qty));
            }
        }
    }
    out.push_str(&format!("Total: ${total:.2}\n"));
    out
}
