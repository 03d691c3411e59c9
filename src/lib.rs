//! # allocbook
//!
//! Deterministic mean-variance rebalancing for long-only equity portfolios.
//!
//! Given price histories, current holdings and current quotes, allocbook
//! computes target weights and the whole-share trades that move the
//! portfolio toward them. It never places orders.
//!
//! ## Pipeline
//!
//! | Stage | Function | Output |
//! |-------|----------|--------|
//! | Clean | [`clean`] | aligned, forward-filled [`PriceMatrix`] + dropped symbols |
//! | Optimize | [`optimize`] | [`Allocation`]: weights, expected return, variance |
//! | Plan | [`plan`] | [`Plan`]: current weights, [`Trade`]s, skipped symbols |
//! | Report | [`RebalanceReport`] | printable, JSON-serializable summary |
//!
//! [`resolve_universe`] and [`rebalance`] chain the stages in two phases so
//! that current quotes are only requested for symbols that survived cleaning.
//!
//! ## Quick Start
//!
//! ```
//! use allocbook::{plan, PlannerConfig, Side, Symbol, WeightVector};
//!
//! let aaa = Symbol::new("AAA");
//! let bbb = Symbol::new("BBB");
//!
//! let holdings = [(aaa, 10.0), (bbb, 0.0)].into_iter().collect();
//! let prices = [(aaa, 100.0), (bbb, 50.0)].into_iter().collect();
//! let target: WeightVector = [(aaa, 0.4), (bbb, 0.6)].into_iter().collect();
//!
//! let p = plan(&holdings, &prices, &target, &PlannerConfig::default()).unwrap();
//!
//! assert_eq!(p.total_value, 1000.0);
//! assert_eq!(p.trades[0].to_string(), "SELL 6 shares of AAA");
//! assert_eq!(p.trades[1].side, Side::Buy);
//! assert_eq!(p.trades[1].shares, 12);
//! ```
//!
//! ## Faults
//!
//! Problems with a single symbol (no history, no quote, no weight) never
//! abort a run; the symbol is reported with a [`SkipReason`]. Problems with
//! the run as a whole return an [`Error`].
//!
//! ## Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` on data types and
//!   [`RebalanceReport::to_json`].

mod error;
mod history;
pub mod optimize;
mod pipeline;
mod plan;
mod report;
pub mod stats;
mod trade;
mod types;

// Re-export public API
pub use error::{Error, Result, SkipReason};
pub use history::{clean, CleanedHistory, CleanerConfig, PriceMatrix, PriceSeries, DEFAULT_LOOKBACK};
pub use optimize::{
    optimize, solve_mean_variance, Allocation, OptimizerConfig, Solution, DEFAULT_RISK_AVERSION,
};
pub use pipeline::{rebalance, resolve_universe, RebalanceConfig, Universe};
pub use plan::{plan, Plan, PlannerConfig, Rounding};
pub use report::RebalanceReport;
pub use trade::{Side, Trade};
pub use types::{CurrentPrices, Holdings, Symbol, Timestamp, WeightVector};
