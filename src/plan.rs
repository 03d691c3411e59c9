//! Current → target diff: weight comparison and whole-share trades.
//!
//! For every symbol with a usable holding, quote and target weight:
//!
//! ```text
//! total_value    = Σ holding · price
//! current_weight = holding · price / total_value
//! shares         = round((target_weight − current_weight) · total_value / price)
//! ```
//!
//! A symbol missing any input is set aside with a [`SkipReason`] and left out
//! of `total_value`; it never aborts the plan. A non-positive total value
//! does, since no weight is defined against it.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{Error, Result, SkipReason};
use crate::history::is_valid_price;
use crate::trade::Trade;
use crate::types::{CurrentPrices, Holdings, Symbol, WeightVector};

/// How fractional share deltas become whole shares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Rounding {
    /// Ties go to the even neighbour: 2.5 → 2, 3.5 → 4, −2.5 → −2.
    #[default]
    HalfEven,
    /// Ties go away from zero: 2.5 → 3, −2.5 → −3.
    HalfAwayFromZero,
}

impl Rounding {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Rounding::HalfEven => x.round_ties_even(),
            Rounding::HalfAwayFromZero => x.round(),
        }
    }
}

/// Planner settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlannerConfig {
    pub rounding: Rounding,
}

/// Result of [`plan`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plan {
    /// Market value of every symbol that took part in the plan.
    pub total_value: f64,
    /// Market-value weight of each participating symbol.
    pub current_weights: BTreeMap<Symbol, f64>,
    /// Proposed trades, in symbol order. Zero-share deltas are omitted.
    pub trades: Vec<Trade>,
    /// Symbols left out, with the reason.
    pub skipped: BTreeMap<Symbol, SkipReason>,
}

/// Diff current holdings against target weights.
///
/// Symbols are visited in sorted order over the union of `holdings` and
/// `weights`, so identical inputs always produce identical trade lists.
pub fn plan(
    holdings: &Holdings,
    prices: &CurrentPrices,
    weights: &WeightVector,
    config: &PlannerConfig,
) -> Result<Plan> {
    let universe: BTreeSet<Symbol> = holdings.keys().copied().chain(weights.symbols()).collect();

    let mut skipped = BTreeMap::new();
    // (symbol, holding, price, target)
    let mut eligible: Vec<(Symbol, f64, f64, f64)> = Vec::with_capacity(universe.len());

    for sym in universe {
        let holding = match holdings.get(&sym) {
            Some(&h) if h.is_finite() && h >= 0.0 => h,
            _ => {
                skipped.insert(sym, SkipReason::InvalidHolding);
                continue;
            }
        };
        let target = match weights.get(&sym) {
            Some(w) if w.is_finite() => w,
            _ => {
                skipped.insert(sym, SkipReason::MissingWeight);
                continue;
            }
        };
        let price = match prices.get(&sym) {
            Some(&p) if is_valid_price(p) => p,
            _ => {
                skipped.insert(sym, SkipReason::MissingPrice);
                continue;
            }
        };
        eligible.push((sym, holding, price, target));
    }

    let total_value: f64 = eligible.iter().map(|&(_, h, p, _)| h * p).sum();
    if !(total_value.is_finite() && total_value > 0.0) {
        return Err(Error::ZeroPortfolioValue(total_value));
    }

    let mut current_weights = BTreeMap::new();
    let mut trades = Vec::new();

    for (sym, holding, price, target) in eligible {
        let current = holding * price / total_value;
        current_weights.insert(sym, current);

        let delta_shares = config.rounding.apply((target - current) * total_value / price);
        // Saturating float → int cast; deltas beyond i64 are not realistic.
        if let Some(trade) = Trade::from_delta(sym, delta_shares as i64) {
            trades.push(trade);
        }
    }

    debug!(
        "planned {} trades over {} symbols (total value {total_value:.2}, {} skipped)",
        trades.len(),
        current_weights.len(),
        skipped.len()
    );

    Ok(Plan {
        total_value,
        current_weights,
        trades,
        skipped,
    })
}
