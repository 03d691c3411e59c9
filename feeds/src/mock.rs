//! Mock price source for testing: serves canned data and records every call.
//!
//! Use this in integration tests to simulate a data provider without network calls.
//!
//! ```
//! use allocbook::Symbol;
//! use allocbook_feeds::mock::MockSource;
//! use allocbook_feeds::PriceSource;
//!
//! let source = MockSource::builder()
//!     .with_price(Symbol::new("AAPL"), 190.0)
//!     .with_history(Symbol::new("AAPL"), &[(1, 185.0), (2, 188.5), (3, 190.0)])
//!     .build();
//!
//! let prices = source.current_prices(&[Symbol::new("AAPL"), Symbol::new("MSFT")]).unwrap();
//! assert_eq!(prices.len(), 1);
//! assert_eq!(source.calls().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use allocbook::{CurrentPrices, PriceSeries, Symbol};

use crate::error::FeedError;
use crate::{trailing, PriceSource};

/// A recorded request for assertion in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedCall {
    CurrentPrices(Vec<Symbol>),
    History { symbol: Symbol, lookback: usize },
}

/// Builder for `MockSource`.
#[derive(Default)]
pub struct MockSourceBuilder {
    prices: CurrentPrices,
    histories: BTreeMap<Symbol, Vec<(i64, f64)>>,
    failing: BTreeSet<Symbol>,
    fail_quotes: bool,
}

impl MockSourceBuilder {
    pub fn with_price(mut self, symbol: Symbol, price: f64) -> Self {
        self.prices.insert(symbol, price);
        self
    }

    /// Canned history. Points must have increasing timestamps.
    pub fn with_history(mut self, symbol: Symbol, points: &[(i64, f64)]) -> Self {
        self.histories.insert(symbol, points.to_vec());
        self
    }

    /// History requests for `symbol` fail with a connection error.
    pub fn failing_history(mut self, symbol: Symbol) -> Self {
        self.failing.insert(symbol);
        self
    }

    /// Quote requests fail with a connection error.
    pub fn failing_quotes(mut self) -> Self {
        self.fail_quotes = true;
        self
    }

    pub fn build(self) -> MockSource {
        MockSource {
            prices: self.prices,
            histories: self.histories,
            failing: self.failing,
            fail_quotes: self.fail_quotes,
            calls: Mutex::new(Vec::new()),
        }
    }
}

/// An in-memory price source that records every request it serves.
pub struct MockSource {
    prices: CurrentPrices,
    histories: BTreeMap<Symbol, Vec<(i64, f64)>>,
    failing: BTreeSet<Symbol>,
    fail_quotes: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockSource {
    pub fn builder() -> MockSourceBuilder {
        MockSourceBuilder::default()
    }

    /// Every request served so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Symbols passed to the most recent `current_prices` call.
    pub fn last_quote_request(&self) -> Option<Vec<Symbol>> {
        self.calls().into_iter().rev().find_map(|c| match c {
            RecordedCall::CurrentPrices(symbols) => Some(symbols),
            RecordedCall::History { .. } => None,
        })
    }

    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl PriceSource for MockSource {
    fn current_prices(&self, symbols: &[Symbol]) -> Result<CurrentPrices, FeedError> {
        self.record(RecordedCall::CurrentPrices(symbols.to_vec()));
        if self.fail_quotes {
            return Err(FeedError::Connection("mock: quotes unavailable".into()));
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.prices.get(s).map(|p| (*s, *p)))
            .collect())
    }

    fn history(&self, symbol: Symbol, lookback: usize) -> Result<PriceSeries, FeedError> {
        self.record(RecordedCall::History { symbol, lookback });
        if self.failing.contains(&symbol) {
            return Err(FeedError::Connection(format!("mock: no route to {symbol}")));
        }
        match self.histories.get(&symbol) {
            Some(points) => PriceSeries::new(trailing(points, lookback))
                .map_err(|e| FeedError::Parse(format!("{symbol}: {e}"))),
            None => Ok(PriceSeries::empty()),
        }
    }
}
