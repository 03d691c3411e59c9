//! End-to-end runs over frozen inputs: clean → optimize → plan → report.

use std::collections::BTreeMap;

use allocbook::{
    clean, rebalance, resolve_universe, CleanerConfig, CurrentPrices, Holdings, PriceSeries,
    RebalanceConfig, RebalanceReport, Rounding, Side, SkipReason, Symbol,
};

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

const DAY: i64 = 86_400;

/// Deterministic random walk: `days` closes starting at `start`, each day
/// moving by `drift` plus up to ±2% of noise.
fn walk(seed: u32, start: f64, drift: f64, days: i64) -> Vec<(i64, f64)> {
    // xorshift32
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

/// Thirty trading days for five tickers. MSFT has a hole in the middle,
/// NEWCO lists halfway through and GONE never traded.
fn frozen_histories() -> BTreeMap<Symbol, PriceSeries> {
    let mut out = BTreeMap::new();

    out.insert(sym("AAPL"), PriceSeries::new(walk(7, 180.0, 0.002, 30)).unwrap());
    out.insert(sym("KO"), PriceSeries::new(walk(11, 60.0, 0.0005, 30)).unwrap());

    let mut msft = walk(23, 400.0, 0.001, 30);
    msft.retain(|&(ts, _)| ts != 12 * DAY);
    out.insert(sym("MSFT"), PriceSeries::new(msft).unwrap());

    let newco: Vec<_> = walk(42, 20.0, 0.004, 30).into_iter().skip(15).collect();
    out.insert(sym("NEWCO"), PriceSeries::new(newco).unwrap());

    out.insert(sym("GONE"), PriceSeries::empty());
    out
}

fn frozen_holdings() -> Holdings {
    [
        (sym("AAPL"), 10.0),
        (sym("KO"), 50.0),
        (sym("MSFT"), 2.0),
        (sym("NEWCO"), 100.0),
        (sym("GONE"), 5.0),
    ]
    .into_iter()
    .collect()
}

/// Quotes the data source would return for `symbols`.
fn quotes_for(symbols: &[Symbol]) -> CurrentPrices {
    let book: CurrentPrices = [
        (sym("AAPL"), 190.0),
        (sym("KO"), 61.0),
        (sym("MSFT"), 410.0),
        (sym("NEWCO"), 24.0),
    ]
    .into_iter()
    .collect();
    symbols
        .iter()
        .filter_map(|s| book.get(s).map(|p| (*s, *p)))
        .collect()
}

fn run(config: &RebalanceConfig) -> RebalanceReport {
    let universe = resolve_universe(&frozen_histories(), config).unwrap();
    let prices = quotes_for(&universe.symbols());
    rebalance(&universe, &frozen_holdings(), &prices, config).unwrap()
}

// ============================================================================
// Cleaner example
// ============================================================================

#[test]
fn complete_gapped_and_empty_series() {
    let input: BTreeMap<_, _> = [
        (sym("A"), PriceSeries::new(vec![(1, 10.0), (2, 11.0), (3, 12.0)]).unwrap()),
        (sym("B"), PriceSeries::new(vec![(1, 20.0), (3, 22.0)]).unwrap()),
        (sym("C"), PriceSeries::empty()),
    ]
    .into_iter()
    .collect();

    let cleaned = clean(&input, &CleanerConfig::default());

    assert_eq!(cleaned.matrix.symbols(), &[sym("A"), sym("B")]);
    assert_eq!(cleaned.matrix.column(&sym("B")).unwrap(), &[20.0, 20.0, 22.0]);
    assert_eq!(cleaned.dropped.len(), 1);
    assert_eq!(cleaned.dropped[&sym("C")], SkipReason::NoHistory);
}

// ============================================================================
// Two-phase run
// ============================================================================

#[test]
fn universe_excludes_unusable_histories() {
    let universe = resolve_universe(&frozen_histories(), &RebalanceConfig::default()).unwrap();

    assert_eq!(
        universe.symbols(),
        vec![sym("AAPL"), sym("KO"), sym("MSFT")]
    );
    assert_eq!(universe.dropped()[&sym("GONE")], SkipReason::NoHistory);
    assert_eq!(
        universe.dropped()[&sym("NEWCO")],
        SkipReason::DataGap { first_missing: 0 }
    );
    assert_eq!(universe.history_rows(), 30);
}

#[test]
fn lookback_window_admits_late_listing() {
    let mut config = RebalanceConfig::default();
    config.cleaner.lookback = Some(10);
    let universe = resolve_universe(&frozen_histories(), &config).unwrap();

    assert!(universe.symbols().contains(&sym("NEWCO")));
    assert_eq!(universe.history_rows(), 10);
}

#[test]
fn report_covers_every_holding() {
    let report = run(&RebalanceConfig::default());

    for s in frozen_holdings().keys() {
        let planned = report.current_weights().contains_key(s);
        let skipped = report.skipped().contains_key(s);
        assert!(planned ^ skipped, "{s} must be either planned or skipped");
    }
    assert_eq!(report.skipped()[&sym("GONE")], SkipReason::NoHistory);
    assert!(!report.prices().contains_key(&sym("NEWCO")));
    assert_eq!(
        report.total_value(),
        10.0 * 190.0 + 50.0 * 61.0 + 2.0 * 410.0
    );
}

#[test]
fn trades_move_toward_target() {
    let report = run(&RebalanceConfig::default());

    for trade in report.trades() {
        let target = report.target_weights().get(&trade.symbol).unwrap();
        let current = report.current_weights()[&trade.symbol];
        match trade.side {
            Side::Buy => assert!(target > current, "{trade}"),
            Side::Sell => assert!(target < current, "{trade}"),
        }
    }
    let symbols: Vec<Symbol> = report.trades().iter().map(|t| t.symbol).collect();
    let mut sorted = symbols.clone();
    sorted.sort();
    assert_eq!(symbols, sorted);
}

#[test]
fn post_trade_weights_are_close_to_target() {
    let report = run(&RebalanceConfig::default());
    let total = report.total_value();

    for (s, target) in report.target_weights().iter() {
        let price = report.prices()[&s];
        let held = report.holdings()[&s];
        let delta = report
            .trades()
            .iter()
            .find(|t| t.symbol == s)
            .map_or(0, |t| t.signed_shares());
        let after = (held + delta as f64) * price / total;
        // Whole-share rounding leaves at most half a share of drift.
        assert!((after - target).abs() <= 0.5 * price / total + 1e-12, "{s}");
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn identical_inputs_give_identical_reports() {
    let config = RebalanceConfig::default();
    let first = run(&config);
    let second = run(&config);

    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn rounding_mode_is_honoured_end_to_end() {
    let mut config = RebalanceConfig::default();
    config.planner.rounding = Rounding::HalfAwayFromZero;
    let away = run(&config);
    let even = run(&RebalanceConfig::default());

    // Same weights either way; only the share rounding may differ.
    assert_eq!(away.target_weights(), even.target_weights());
    let shares = |r: &RebalanceReport, s: Symbol| {
        r.trades()
            .iter()
            .find(|t| t.symbol == s)
            .map_or(0, |t| t.signed_shares())
    };
    for s in away.target_weights().symbols() {
        assert!(shares(&away, s).abs_diff(shares(&even, s)) <= 1, "{s}");
    }
}

#[test]
fn higher_risk_aversion_lowers_variance() {
    let histories = frozen_histories();
    let mut last = f64::INFINITY;
    for lambda in [0.0, 0.5, 5.0, 50.0, 500.0] {
        let mut config = RebalanceConfig::default();
        config.optimizer.risk_aversion = lambda;
        let universe = resolve_universe(&histories, &config).unwrap();
        let variance = universe.allocation().variance;
        assert!(variance <= last + 1e-12, "lambda {lambda}: {variance} > {last}");
        last = variance;
    }
}
