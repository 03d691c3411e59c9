//! Price history: per-symbol series, the aligned price matrix, and the
//! cleaner that turns one into the other.
//!
//! Series are fetched independently and rarely line up: one symbol trades on
//! a holiday another skips, a feed drops a day, a new listing has no early
//! data. [`clean`] aligns everything on the union of timestamps, forward-fills
//! short gaps, and drops any symbol that still has a hole. Dropped symbols
//! are returned with a [`SkipReason`] rather than silently lost.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result, SkipReason};
use crate::types::{Symbol, Timestamp};

/// Default number of trailing periods kept by the cleaner.
pub const DEFAULT_LOOKBACK: usize = 30;

/// A price is usable if it is a positive finite number.
#[inline]
pub(crate) fn is_valid_price(p: f64) -> bool {
    p.is_finite() && p > 0.0
}

/// Chronologically ordered `(timestamp, price)` observations for one symbol.
///
/// Observations whose price is not a positive finite number are kept but
/// count as missing when the series is cleaned.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<(Timestamp, f64)>", into = "Vec<(Timestamp, f64)>")
)]
pub struct PriceSeries {
    points: Vec<(Timestamp, f64)>,
}

impl PriceSeries {
    /// Build a series; timestamps must be strictly increasing.
    pub fn new(points: Vec<(Timestamp, f64)>) -> Result<Self> {
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            let what = if w[1].0 == w[0].0 {
                "duplicate"
            } else {
                "out-of-order"
            };
            return Err(Error::InvalidSeries(format!(
                "{what} timestamp {} after {}",
                w[1].0, w[0].0
            )));
        }
        Ok(Self { points })
    }

    /// A series with no observations.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[(Timestamp, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent usable price.
    pub fn last_price(&self) -> Option<f64> {
        self.points
            .iter()
            .rev()
            .map(|&(_, p)| p)
            .find(|p| is_valid_price(*p))
    }
}

impl TryFrom<Vec<(Timestamp, f64)>> for PriceSeries {
    type Error = Error;

    fn try_from(points: Vec<(Timestamp, f64)>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<PriceSeries> for Vec<(Timestamp, f64)> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

/// Prices for several symbols on one shared timestamp index, with no holes.
///
/// Columns are stored per symbol, symbols in sorted order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceMatrix {
    index: Vec<Timestamp>,
    symbols: Vec<Symbol>,
    columns: Vec<Vec<f64>>,
}

impl PriceMatrix {
    /// Build a matrix from explicit columns.
    ///
    /// Every column must match the index length and hold only usable prices;
    /// the index must be strictly increasing and symbols unique.
    pub fn new(index: Vec<Timestamp>, columns: Vec<(Symbol, Vec<f64>)>) -> Result<Self> {
        if index.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidSeries(
                "matrix index must be strictly increasing".into(),
            ));
        }

        let mut sorted: BTreeMap<Symbol, Vec<f64>> = BTreeMap::new();
        for (sym, col) in columns {
            if col.len() != index.len() {
                return Err(Error::InvalidSeries(format!(
                    "column {sym} has {} values for {} timestamps",
                    col.len(),
                    index.len()
                )));
            }
            if col.iter().any(|p| !is_valid_price(*p)) {
                return Err(Error::InvalidSeries(format!(
                    "column {sym} contains a missing or non-positive price"
                )));
            }
            if sorted.insert(sym, col).is_some() {
                return Err(Error::InvalidSeries(format!("duplicate column {sym}")));
            }
        }

        let (symbols, columns): (Vec<Symbol>, Vec<Vec<f64>>) = sorted.into_iter().unzip();
        Ok(Self {
            index,
            symbols,
            columns,
        })
    }

    /// A matrix with no symbols and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of aligned observations (rows).
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of symbols (columns).
    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbol survived.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn column(&self, symbol: &Symbol) -> Option<&[f64]> {
        let i = self.symbols.binary_search(symbol).ok()?;
        Some(&self.columns[i])
    }

    /// Iterate `(symbol, column)` in symbol order.
    pub fn columns(&self) -> impl Iterator<Item = (Symbol, &[f64])> + '_ {
        self.symbols
            .iter()
            .copied()
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Row-major copy of the prices: `rows[t][j]` is symbol `j` at time `t`.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_rows())
            .map(|t| self.columns.iter().map(|col| col[t]).collect())
            .collect()
    }
}

/// Cleaner settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanerConfig {
    /// Keep only this many trailing rows of the aligned index.
    /// `None` keeps the full history.
    pub lookback: Option<usize>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            lookback: Some(DEFAULT_LOOKBACK),
        }
    }
}

impl CleanerConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.lookback {
            if n < 2 {
                return Err(Error::InvalidConfig(format!(
                    "lookback must be at least 2 periods, got {n}"
                )));
            }
        }
        Ok(())
    }
}

/// Output of [`clean`]: the aligned matrix and the symbols that did not make it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CleanedHistory {
    pub matrix: PriceMatrix,
    pub dropped: BTreeMap<Symbol, SkipReason>,
}

/// Align, forward-fill and prune a set of price series.
///
/// Forward-fill runs over the whole aligned index before the lookback window
/// is applied, so an observation older than the window can still seed it.
pub fn clean(series: &BTreeMap<Symbol, PriceSeries>, config: &CleanerConfig) -> CleanedHistory {
    let index: Vec<Timestamp> = series
        .values()
        .flat_map(|s| s.points().iter().map(|&(ts, _)| ts))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let start = match config.lookback {
        Some(n) => index.len().saturating_sub(n),
        None => 0,
    };
    let window = &index[start..];

    let mut kept: Vec<(Symbol, Vec<f64>)> = Vec::with_capacity(series.len());
    let mut dropped = BTreeMap::new();

    for (&sym, s) in series {
        let observed: FxHashMap<Timestamp, f64> = s
            .points()
            .iter()
            .copied()
            .filter(|&(_, p)| is_valid_price(p))
            .collect();

        if observed.is_empty() {
            debug!("{sym}: no usable history");
            dropped.insert(sym, SkipReason::NoHistory);
            continue;
        }

        let mut last = None;
        let filled: Vec<Option<f64>> = index
            .iter()
            .map(|ts| {
                if let Some(&p) = observed.get(ts) {
                    last = Some(p);
                }
                last
            })
            .collect();

        match filled[start..].iter().position(Option::is_none) {
            Some(gap) => {
                let first_missing = window[gap];
                debug!("{sym}: unfillable gap at {first_missing}");
                dropped.insert(sym, SkipReason::DataGap { first_missing });
            }
            None => {
                let column = filled[start..].iter().flatten().copied().collect();
                kept.push((sym, column));
            }
        }
    }

    debug!(
        "cleaned {} series over {} rows: kept {}, dropped {}",
        series.len(),
        window.len(),
        kept.len(),
        dropped.len()
    );

    let matrix = if kept.is_empty() {
        PriceMatrix::empty()
    } else {
        // BTreeMap iteration already yields symbols sorted and unique.
        let symbols = kept.iter().map(|(s, _)| *s).collect();
        let columns = kept.into_iter().map(|(_, c)| c).collect();
        PriceMatrix {
            index: window.to_vec(),
            symbols,
            columns,
        }
    };

    CleanedHistory { matrix, dropped }
}
