//! Error and skip-reason types for the allocation pipeline.
//!
//! Faults come in two flavours. Universe-level problems abort the run and
//! surface as [`Error`]. Problems confined to one symbol never abort: the
//! symbol is set aside with a [`SkipReason`] and reported alongside the
//! result.

use std::fmt;

use crate::types::Timestamp;

/// Fatal errors: the run cannot produce a trustworthy result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No symbol survived cleaning, so there is nothing to optimize.
    #[error("no symbols left to optimize after cleaning price history")]
    EmptyUniverse,

    /// The solver did not converge or the constraints are infeasible.
    #[error("optimization failed: {0}")]
    Optimization(String),

    /// Total current portfolio value is zero or negative.
    #[error("total portfolio value is {0}; current weights are undefined")]
    ZeroPortfolioValue(f64),

    #[error("need at least 2 aligned price observations, got {0}")]
    InsufficientHistory(usize),

    #[error("invalid price series: {0}")]
    InvalidSeries(String),

    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single symbol was left out of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "reason", rename_all = "snake_case"))]
pub enum SkipReason {
    /// The price history had no usable observation at all.
    NoHistory,
    /// The price history had a gap with nothing before it to forward-fill from.
    DataGap { first_missing: Timestamp },
    /// No current quote, or the quote was not a positive finite number.
    MissingPrice,
    /// No target weight, or a non-finite one.
    MissingWeight,
    /// Holding absent, negative or not finite.
    InvalidHolding,
}

impl SkipReason {
    /// True for reasons raised while cleaning history (before optimization).
    pub fn is_data_gap(self) -> bool {
        matches!(self, SkipReason::NoHistory | SkipReason::DataGap { .. })
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoHistory => write!(f, "missing data: no price history"),
            SkipReason::DataGap { first_missing } => {
                write!(f, "missing data: unfillable gap at {first_missing}")
            }
            SkipReason::MissingPrice => write!(f, "missing data: no current price"),
            SkipReason::MissingWeight => write!(f, "missing data: no target weight"),
            SkipReason::InvalidHolding => write!(f, "missing data: invalid holding"),
        }
    }
}
