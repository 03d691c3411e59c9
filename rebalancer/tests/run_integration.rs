//! Integration tests for the rebalancer workflow against a mock data source
//! and a recording summarizer. No network access.

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;

use allocbook::{Holdings, RebalanceReport, SkipReason, Symbol};
use allocbook_feeds::mock::{MockSource, RecordedCall};
use allocbook_feeds::snapshot::SnapshotSource;
use allocbook_rebalancer::audit::AuditLog;
use allocbook_rebalancer::config::Config;
use allocbook_rebalancer::error::{Error, Result};
use allocbook_rebalancer::execution::{self, RunOptions};
use allocbook_rebalancer::explain::{EXPLAIN_REQUEST, Summarizer, build_prompt};
use allocbook_rebalancer::portfolio::{HoldingsStore, JsonPortfolioStore};

const DAY: i64 = 86_400;

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

/// Deterministic random walk of `days` daily closes.
fn walk(seed: u32, start: f64, drift: f64, days: i64) -> Vec<(i64, f64)> {
    let mut state = seed;
    let mut price = start;
    (0..days)
        .map(|d| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let noise = (state % 401) as f64 / 10_000.0 - 0.02;
            if d > 0 {
                price *= 1.0 + drift + noise;
            }
            (d * DAY, price)
        })
        .collect()
}

/// AAA and BBB have forty days of history; GONE is quoted but never traded.
fn source() -> MockSource {
    MockSource::builder()
        .with_history(sym("AAA"), &walk(3, 100.0, 0.002, 40))
        .with_history(sym("BBB"), &walk(19, 50.0, 0.0005, 40))
        .with_price(sym("AAA"), 105.0)
        .with_price(sym("BBB"), 51.0)
        .with_price(sym("GONE"), 20.0)
        .build()
}

fn holdings() -> Holdings {
    [(sym("AAA"), 10.0), (sym("BBB"), 20.0), (sym("GONE"), 5.0)]
        .into_iter()
        .collect()
}

fn quiet_config() -> Config {
    let mut config = Config::default();
    config.logging.enabled = false;
    config
}

struct RecordingSummarizer {
    reply: &'static str,
    prompts: RefCell<Vec<String>>,
}

impl RecordingSummarizer {
    fn new(reply: &'static str) -> Self {
        Self {
            reply,
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl Summarizer for RecordingSummarizer {
    fn summarize(&self, report: &RebalanceReport, request: &str) -> Result<String> {
        self.prompts.borrow_mut().push(build_prompt(report, request)?);
        Ok(self.reply.to_string())
    }
}

struct FailingSummarizer;

impl Summarizer for FailingSummarizer {
    fn summarize(&self, _report: &RebalanceReport, _request: &str) -> Result<String> {
        Err(Error::Summarizer("503 Service Unavailable".into()))
    }
}

fn audit_events(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ============================================================================
// Two-phase protocol
// ============================================================================

#[test]
fn quotes_requested_only_for_resolved_universe() {
    let source = source();
    let report = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source,
        &mut AuditLog::disabled(),
    )
    .unwrap();

    assert_eq!(
        source.last_quote_request(),
        Some(vec![sym("AAA"), sym("BBB")])
    );
    assert_eq!(report.skipped().get(&sym("GONE")), Some(&SkipReason::NoHistory));
    assert!(!report.prices().contains_key(&sym("GONE")));
}

#[test]
fn histories_requested_for_every_holding_then_one_quote_call() {
    let source = source();
    let mut config = quiet_config();
    config.history.lookback = 10;

    execution::plan_run(&config, &holdings(), &source, &mut AuditLog::disabled()).unwrap();

    let calls = source.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(
        calls[..3],
        [
            RecordedCall::History { symbol: sym("AAA"), lookback: 10 },
            RecordedCall::History { symbol: sym("BBB"), lookback: 10 },
            RecordedCall::History { symbol: sym("GONE"), lookback: 10 },
        ]
    );
    assert!(matches!(calls[3], RecordedCall::CurrentPrices(_)));
}

#[test]
fn report_is_consistent() {
    let report = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source(),
        &mut AuditLog::disabled(),
    )
    .unwrap();

    // GONE has no history, so its value is not part of the total.
    assert!((report.total_value() - (10.0 * 105.0 + 20.0 * 51.0)).abs() < 1e-9);
    assert!((report.target_weights().total() - 1.0).abs() < 1e-6);
    for trade in report.trades() {
        assert!(trade.shares > 0);
        assert_ne!(trade.symbol, sym("GONE"));
    }
    assert_eq!(report.risk_aversion(), 0.5);
}

#[test]
fn runs_are_deterministic() {
    let run = || {
        execution::plan_run(
            &quiet_config(),
            &holdings(),
            &source(),
            &mut AuditLog::disabled(),
        )
        .unwrap()
        .to_json()
        .unwrap()
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Explanation
// ============================================================================

#[test]
fn summarizer_sees_holdings_prices_and_trades() {
    let report = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source(),
        &mut AuditLog::disabled(),
    )
    .unwrap();
    let summarizer = RecordingSummarizer::new("Shifting weight to AAA raises expected return.");

    let text = execution::explain(&report, &summarizer, &mut AuditLog::disabled()).unwrap();
    assert_eq!(text, "Shifting weight to AAA raises expected return.");

    let prompts = summarizer.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.starts_with("I have a portfolio: {\"AAA\":10.0,\"BBB\":20.0,\"GONE\":5.0}"));
    assert!(prompt.contains("Current prices: {\"AAA\":105.0,\"BBB\":51.0}"));
    assert!(prompt.contains("mean-variance optimization (\u{3bb}=0.5)"));
    for trade in report.trades() {
        assert!(prompt.contains(&trade.to_string()));
    }
    assert!(prompt.ends_with(EXPLAIN_REQUEST));
}

#[test]
fn summarizer_failure_surfaces() {
    let report = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source(),
        &mut AuditLog::disabled(),
    )
    .unwrap();
    let err = execution::explain(&report, &FailingSummarizer, &mut AuditLog::disabled())
        .unwrap_err();
    assert!(matches!(err, Error::Summarizer(_)));
    assert!(!err.is_rebalance_abort());
}

// ============================================================================
// Audit trail
// ============================================================================

#[test]
fn full_run_writes_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.logging.dir = dir.path().join("logs").display().to_string();

    let summarizer = RecordingSummarizer::new("Lower variance.");
    let opts = RunOptions {
        json: true,
        portfolio_file: "portfolio.json".into(),
        source_name: "mock".into(),
    };
    let summarizer: &dyn Summarizer = &summarizer;
    execution::run(&config, &holdings(), &source(), Some(summarizer), &opts).unwrap();

    let events = audit_events(&config.audit_path());
    let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "run_started",
            "universe_resolved",
            "plan_computed",
            "explanation_received",
            "run_completed",
        ]
    );

    assert_eq!(events[0]["portfolio_file"], "portfolio.json");
    assert_eq!(events[0]["source"], "mock");
    assert_eq!(events[1]["dropped"]["GONE"], "missing data: no price history");
    assert!(events[1]["weights"]["AAA"].is_number());
    assert!((events[2]["total_value"].as_f64().unwrap() - 2070.0).abs() < 1e-9);
    assert_eq!(events[3]["text"], "Lower variance.");
    assert_eq!(events[4]["skipped"], 1);
}

#[test]
fn run_without_summarizer_skips_explanation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.logging.dir = dir.path().display().to_string();

    let opts = RunOptions {
        json: false,
        portfolio_file: "p.json".into(),
        source_name: "mock".into(),
    };
    execution::run(&config, &holdings(), &source(), None, &opts).unwrap();

    let events = audit_events(&config.audit_path());
    assert!(events.iter().all(|e| e["event"] != "explanation_received"));
    assert_eq!(events.last().unwrap()["event"], "run_completed");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn history_failure_is_not_an_abort() {
    let source = MockSource::builder()
        .with_history(sym("AAA"), &walk(3, 100.0, 0.002, 40))
        .failing_history(sym("BBB"))
        .build();
    let err = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source,
        &mut AuditLog::disabled(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Feed(_)));
    assert!(!err.is_rebalance_abort());
}

#[test]
fn quote_failure_is_not_an_abort() {
    let source = MockSource::builder()
        .with_history(sym("AAA"), &walk(3, 100.0, 0.002, 40))
        .failing_quotes()
        .build();
    let err = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source,
        &mut AuditLog::disabled(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Feed(_)));
}

#[test]
fn no_history_anywhere_aborts() {
    let source = MockSource::builder().with_price(sym("AAA"), 105.0).build();
    let err = execution::plan_run(
        &quiet_config(),
        &holdings(),
        &source,
        &mut AuditLog::disabled(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Rebalance(allocbook::Error::EmptyUniverse)));
    assert!(err.is_rebalance_abort());
    assert!(source.last_quote_request().is_none());
}

#[test]
fn empty_positions_abort_with_zero_value() {
    let holdings: Holdings = [(sym("AAA"), 0.0), (sym("BBB"), 0.0)].into_iter().collect();
    let err = execution::plan_run(
        &quiet_config(),
        &holdings,
        &source(),
        &mut AuditLog::disabled(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Rebalance(allocbook::Error::ZeroPortfolioValue(_))
    ));
    assert!(err.is_rebalance_abort());
}

// ============================================================================
// Snapshots and files
// ============================================================================

#[test]
fn snapshot_replays_the_same_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.json");
    let config = quiet_config();

    let live = source();
    let captured = execution::capture_snapshot(&config, &holdings(), &live, &path).unwrap();
    assert_eq!(captured.prices().len(), 3);

    let replay = SnapshotSource::load(&path).unwrap();
    let from_live =
        execution::plan_run(&config, &holdings(), &live, &mut AuditLog::disabled()).unwrap();
    let from_snapshot =
        execution::plan_run(&config, &holdings(), &replay, &mut AuditLog::disabled()).unwrap();

    assert_eq!(from_live.trades(), from_snapshot.trades());
    assert_eq!(from_live.skipped(), from_snapshot.skipped());
    assert!((from_live.total_value() - from_snapshot.total_value()).abs() < 1e-9);
}

#[test]
fn portfolio_file_round_trip_into_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "AAA": 10, "BBB": 20, "GONE": 5 }}"#).unwrap();

    let loaded = JsonPortfolioStore::new(file.path()).load_holdings().unwrap();
    assert_eq!(loaded, holdings());
}

#[test]
fn bad_config_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[optimizer]\nrisk_aversion = \"high\"\n").unwrap();

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
    assert!(!err.is_rebalance_abort());
}
