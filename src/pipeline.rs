//! Two-phase rebalance run.
//!
//! Phase one, [`resolve_universe`], turns raw price histories into target
//! weights and fixes the set of symbols the run is about. The caller then
//! fetches current quotes for exactly [`Universe::symbols`] and hands them to
//! phase two, [`rebalance`], which plans trades and assembles the report.
//!
//! ```
//! use std::collections::BTreeMap;
//! use allocbook::{rebalance, resolve_universe, PriceSeries, RebalanceConfig, Symbol};
//!
//! let a = Symbol::new("AAA");
//! let b = Symbol::new("BBB");
//! let histories: BTreeMap<_, _> = [
//!     (a, PriceSeries::new(vec![(1, 100.0), (2, 101.0), (3, 103.0), (4, 102.0)]).unwrap()),
//!     (b, PriceSeries::new(vec![(1, 50.0), (2, 50.5), (3, 50.2), (4, 50.9)]).unwrap()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let config = RebalanceConfig::default();
//! let universe = resolve_universe(&histories, &config).unwrap();
//! assert_eq!(universe.symbols(), vec![a, b]);
//!
//! let holdings = [(a, 10.0), (b, 0.0)].into_iter().collect();
//! let prices = [(a, 102.0), (b, 50.9)].into_iter().collect();
//! let report = rebalance(&universe, &holdings, &prices, &config).unwrap();
//! assert!((report.target_weights().total() - 1.0).abs() < 1e-6);
//! ```

use std::collections::BTreeMap;

use log::{debug, info};

use crate::error::{Result, SkipReason};
use crate::history::{clean, CleanerConfig, PriceSeries};
use crate::optimize::{optimize, Allocation, OptimizerConfig};
use crate::plan::{plan, PlannerConfig};
use crate::report::RebalanceReport;
use crate::types::{CurrentPrices, Holdings, Symbol, WeightVector};

/// Settings for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RebalanceConfig {
    pub cleaner: CleanerConfig,
    pub optimizer: OptimizerConfig,
    pub planner: PlannerConfig,
}

impl RebalanceConfig {
    pub fn validate(&self) -> Result<()> {
        self.cleaner.validate()?;
        self.optimizer.validate()
    }
}

/// Outcome of phase one: the optimized symbol set and what fell out of it.
#[derive(Clone, Debug, PartialEq)]
pub struct Universe {
    allocation: Allocation,
    dropped: BTreeMap<Symbol, SkipReason>,
    history_rows: usize,
    risk_aversion: f64,
}

impl Universe {
    /// Symbols with a target weight, sorted. Quotes are needed for these only.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.allocation.weights.symbols().collect()
    }

    pub fn weights(&self) -> &WeightVector {
        &self.allocation.weights
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Symbols removed while cleaning history.
    pub fn dropped(&self) -> &BTreeMap<Symbol, SkipReason> {
        &self.dropped
    }

    /// Aligned price rows the weights were estimated from.
    pub fn history_rows(&self) -> usize {
        self.history_rows
    }

    pub fn risk_aversion(&self) -> f64 {
        self.risk_aversion
    }
}

/// Phase one: clean histories and compute target weights.
///
/// Fails with `EmptyUniverse` when no series survives cleaning.
pub fn resolve_universe(
    histories: &BTreeMap<Symbol, PriceSeries>,
    config: &RebalanceConfig,
) -> Result<Universe> {
    config.validate()?;

    let cleaned = clean(histories, &config.cleaner);
    let allocation = optimize(&cleaned.matrix, &config.optimizer)?;

    info!(
        "universe resolved: {} symbols over {} rows, {} dropped",
        allocation.weights.len(),
        cleaned.matrix.n_rows(),
        cleaned.dropped.len()
    );
    debug!(
        "expected return {:.6}, variance {:.6}, {} iterations",
        allocation.expected_return, allocation.variance, allocation.iterations
    );

    Ok(Universe {
        allocation,
        dropped: cleaned.dropped,
        history_rows: cleaned.matrix.n_rows(),
        risk_aversion: config.optimizer.risk_aversion,
    })
}

/// Phase two: plan trades against current quotes and build the report.
///
/// Symbols dropped in phase one keep their history reason even when the
/// planner also sets them aside.
pub fn rebalance(
    universe: &Universe,
    holdings: &Holdings,
    prices: &CurrentPrices,
    config: &RebalanceConfig,
) -> Result<RebalanceReport> {
    let plan = plan(holdings, prices, universe.weights(), &config.planner)?;

    let mut skipped = plan.skipped;
    skipped.extend(universe.dropped.iter().map(|(s, r)| (*s, *r)));

    info!(
        "plan computed: {} trades, total value {:.2}, {} skipped",
        plan.trades.len(),
        plan.total_value,
        skipped.len()
    );

    Ok(RebalanceReport::new(
        holdings.clone(),
        prices.clone(),
        universe.weights().clone(),
        plan.current_weights,
        plan.trades,
        skipped,
        plan.total_value,
        universe.risk_aversion,
    ))
}
