//! Market data sources for allocbook.
//!
//! Provides a generic `PriceSource` trait that abstracts over where quotes
//! and price histories come from. Implementations:
//!
//! - **Mock** ([`mock::MockSource`]): in-memory, records every call
//! - **Snapshot** ([`snapshot::SnapshotSource`]): a frozen JSON file
//! - **Yahoo** (feature `yahoo`): Yahoo Finance chart API

pub mod error;
pub mod mock;
pub mod snapshot;

#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use error::FeedError;

use std::collections::BTreeMap;

use allocbook::{CurrentPrices, PriceSeries, Symbol};
use log::debug;

/// A source of current quotes and daily price history.
///
/// Sources may return partial results: a symbol they know nothing about is
/// absent from [`current_prices`](PriceSource::current_prices) and has an
/// empty [`history`](PriceSource::history). Errors are reserved for failures
/// of the source itself.
pub trait PriceSource {
    /// Latest price for each of `symbols` the source can quote.
    fn current_prices(&self, symbols: &[Symbol]) -> Result<CurrentPrices, FeedError>;

    /// Up to `lookback` most recent daily closes for `symbol`, oldest first.
    fn history(&self, symbol: Symbol, lookback: usize) -> Result<PriceSeries, FeedError>;
}

impl<T: PriceSource + ?Sized> PriceSource for &T {
    fn current_prices(&self, symbols: &[Symbol]) -> Result<CurrentPrices, FeedError> {
        (**self).current_prices(symbols)
    }

    fn history(&self, symbol: Symbol, lookback: usize) -> Result<PriceSeries, FeedError> {
        (**self).history(symbol, lookback)
    }
}

impl<T: PriceSource + ?Sized> PriceSource for Box<T> {
    fn current_prices(&self, symbols: &[Symbol]) -> Result<CurrentPrices, FeedError> {
        (**self).current_prices(symbols)
    }

    fn history(&self, symbol: Symbol, lookback: usize) -> Result<PriceSeries, FeedError> {
        (**self).history(symbol, lookback)
    }
}

/// Fetch histories for every symbol, one request at a time.
///
/// Stops at the first source error.
pub fn fetch_histories<S: PriceSource + ?Sized>(
    source: &S,
    symbols: &[Symbol],
    lookback: usize,
) -> Result<BTreeMap<Symbol, PriceSeries>, FeedError> {
    let mut out = BTreeMap::new();
    for &symbol in symbols {
        let series = source.history(symbol, lookback)?;
        debug!("{symbol}: {} history points", series.len());
        out.insert(symbol, series);
    }
    Ok(out)
}

/// Keep only the last `lookback` points of `points`.
pub(crate) fn trailing(points: &[(i64, f64)], lookback: usize) -> Vec<(i64, f64)> {
    points[points.len().saturating_sub(lookback)..].to_vec()
}
