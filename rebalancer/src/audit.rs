//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use allocbook::{RebalanceReport, Universe};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger. A disabled log accepts events and drops them.
pub struct AuditLog {
    writer: Option<BufWriter<std::fs::File>>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }
}

fn skipped_json<'a>(
    skipped: impl IntoIterator<Item = (&'a allocbook::Symbol, &'a allocbook::SkipReason)>,
) -> serde_json::Value {
    skipped
        .into_iter()
        .map(|(s, r)| (s.as_str().to_string(), serde_json::Value::from(r.to_string())))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

/// Convenience: log a run start event.
pub fn log_run_started(
    audit: &mut AuditLog,
    portfolio_file: &str,
    source: &str,
    risk_aversion: f64,
    lookback: usize,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "portfolio_file": portfolio_file,
            "source": source,
            "risk_aversion": risk_aversion,
            "lookback": lookback,
        }),
    )
}

/// Convenience: log the optimized universe.
pub fn log_universe(audit: &mut AuditLog, universe: &Universe) -> Result<()> {
    let allocation = universe.allocation();
    audit.log(
        "universe_resolved",
        serde_json::json!({
            "weights": &allocation.weights,
            "dropped": skipped_json(universe.dropped()),
            "history_rows": universe.history_rows(),
            "expected_return": allocation.expected_return,
            "variance": allocation.variance,
            "iterations": allocation.iterations,
        }),
    )
}

/// Convenience: log the planned trades.
pub fn log_plan(audit: &mut AuditLog, report: &RebalanceReport) -> Result<()> {
    let trade_data: Vec<_> = report
        .trades()
        .iter()
        .map(|t| {
            serde_json::json!({
                "symbol": t.symbol.as_str(),
                "side": t.side.to_string(),
                "shares": t.shares,
            })
        })
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "total_value": report.total_value(),
            "prices": report.prices(),
            "trades": trade_data,
            "skipped": skipped_json(report.skipped()),
        }),
    )
}

/// Convenience: log the summarizer reply.
pub fn log_explanation(audit: &mut AuditLog, text: &str) -> Result<()> {
    audit.log(
        "explanation_received",
        serde_json::json!({ "text": text }),
    )
}

/// Convenience: log run completion.
pub fn log_run_completed(audit: &mut AuditLog, trades: usize, skipped: usize) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "trades": trades,
            "skipped": skipped,
        }),
    )
}
