//! Final output of a rebalance run.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SkipReason;
use crate::trade::Trade;
use crate::types::{CurrentPrices, Holdings, Symbol, WeightVector};

/// Everything a run produced, in a form that can be printed or serialized.
///
/// All maps are ordered by symbol, so two reports built from the same inputs
/// render and serialize identically.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceReport {
    holdings: Holdings,
    prices: CurrentPrices,
    target_weights: WeightVector,
    current_weights: BTreeMap<Symbol, f64>,
    trades: Vec<Trade>,
    skipped: BTreeMap<Symbol, SkipReason>,
    total_value: f64,
    risk_aversion: f64,
}

impl RebalanceReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        holdings: Holdings,
        prices: CurrentPrices,
        target_weights: WeightVector,
        current_weights: BTreeMap<Symbol, f64>,
        trades: Vec<Trade>,
        skipped: BTreeMap<Symbol, SkipReason>,
        total_value: f64,
        risk_aversion: f64,
    ) -> Self {
        Self {
            holdings,
            prices,
            target_weights,
            current_weights,
            trades,
            skipped,
            total_value,
            risk_aversion,
        }
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    /// Quotes used for the plan. Only symbols that were asked for appear.
    pub fn prices(&self) -> &CurrentPrices {
        &self.prices
    }

    pub fn target_weights(&self) -> &WeightVector {
        &self.target_weights
    }

    pub fn current_weights(&self) -> &BTreeMap<Symbol, f64> {
        &self.current_weights
    }

    /// Proposed trades in symbol order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn skipped(&self) -> &BTreeMap<Symbol, SkipReason> {
        &self.skipped
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    pub fn risk_aversion(&self) -> f64 {
        self.risk_aversion
    }

    /// True when the portfolio is already at target (after rounding).
    pub fn is_balanced(&self) -> bool {
        self.trades.is_empty()
    }

    /// Pretty-printed JSON. Byte-identical for identical reports.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RebalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Proposed orders (dry run):")?;
        if self.trades.is_empty() {
            writeln!(f, "  (No trades needed.)")?;
        }
        for trade in &self.trades {
            writeln!(f, "{trade}")?;
        }
        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped:")?;
            for (sym, reason) in &self.skipped {
                writeln!(f, "  {sym:<8} {reason}")?;
            }
        }
        Ok(())
    }
}
