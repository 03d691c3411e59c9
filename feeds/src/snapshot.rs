//! Frozen market data in a JSON file.
//!
//! A snapshot pins quotes and histories so a rebalance can be re-run with
//! byte-identical output:
//!
//! ```json
//! {
//!   "prices": { "AAPL": 190.0 },
//!   "history": { "AAPL": [[1717372800, 185.0], [1717459200, 190.0]] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use allocbook::{CurrentPrices, PriceSeries, Symbol};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::{trailing, PriceSource};

/// Price source backed by a snapshot file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSource {
    #[serde(default)]
    prices: CurrentPrices,
    #[serde(default)]
    history: BTreeMap<Symbol, PriceSeries>,
}

impl SnapshotSource {
    pub fn new(prices: CurrentPrices, history: BTreeMap<Symbol, PriceSeries>) -> Self {
        Self { prices, history }
    }

    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let content = std::fs::read_to_string(path).map_err(|e| FeedError::SnapshotRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot = Self::from_json(&content)?;
        info!(
            "loaded snapshot {}: {} quotes, {} histories",
            path.display(),
            snapshot.prices.len(),
            snapshot.history.len()
        );
        Ok(snapshot)
    }

    /// Parse snapshot JSON.
    pub fn from_json(content: &str) -> Result<Self, FeedError> {
        serde_json::from_str(content).map_err(|e| FeedError::InvalidSnapshot(e.to_string()))
    }

    /// Record quotes and histories for `symbols` from another source.
    pub fn capture<S: PriceSource + ?Sized>(
        source: &S,
        symbols: &[Symbol],
        lookback: usize,
    ) -> Result<Self, FeedError> {
        let history = crate::fetch_histories(source, symbols, lookback)?;
        let prices = source.current_prices(symbols)?;
        Ok(Self { prices, history })
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), FeedError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FeedError::InvalidSnapshot(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| FeedError::SnapshotWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn prices(&self) -> &CurrentPrices {
        &self.prices
    }

    pub fn histories(&self) -> &BTreeMap<Symbol, PriceSeries> {
        &self.history
    }
}

impl PriceSource for SnapshotSource {
    fn current_prices(&self, symbols: &[Symbol]) -> Result<CurrentPrices, FeedError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.prices.get(s).map(|p| (*s, *p)))
            .collect())
    }

    fn history(&self, symbol: Symbol, lookback: usize) -> Result<PriceSeries, FeedError> {
        match self.history.get(&symbol) {
            Some(series) => PriceSeries::new(trailing(series.points(), lookback))
                .map_err(|e| FeedError::InvalidSnapshot(format!("{symbol}: {e}"))),
            None => Ok(PriceSeries::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSource;

    const SAMPLE: &str = r#"{
        "prices": { "AAA": 102.0, "BBB": 50.5 },
        "history": {
            "AAA": [[1, 100.0], [2, 101.0], [3, 102.0]],
            "BBB": [[1, 50.0], [3, 50.5]]
        }
    }"#;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[test]
    fn parse_and_serve() {
        let snap = SnapshotSource::from_json(SAMPLE).unwrap();

        let prices = snap.current_prices(&[sym("AAA"), sym("CCC")]).unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&sym("AAA")], 102.0);

        let hist = snap.history(sym("AAA"), 2).unwrap();
        assert_eq!(hist.points(), &[(2, 101.0), (3, 102.0)]);
        assert!(snap.history(sym("CCC"), 30).unwrap().is_empty());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snap = SnapshotSource::from_json("{}").unwrap();
        assert!(snap.prices().is_empty());
        assert!(snap.histories().is_empty());
    }

    #[test]
    fn rejects_malformed_files() {
        for bad in [
            "not json",
            r#"{"prices": {"WAY_TOO_LONG": 1.0}}"#,
            r#"{"history": {"AAA": [[2, 1.0], [1, 1.0]]}}"#,
        ] {
            assert!(
                matches!(SnapshotSource::from_json(bad), Err(FeedError::InvalidSnapshot(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");

        let snap = SnapshotSource::from_json(SAMPLE).unwrap();
        snap.save(&path).unwrap();
        let loaded = SnapshotSource::load(&path).unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn load_missing_file() {
        let err = SnapshotSource::load(Path::new("/nonexistent/snap.json")).unwrap_err();
        assert!(matches!(err, FeedError::SnapshotRead { .. }));
    }

    #[test]
    fn capture_from_another_source() {
        let live = MockSource::builder()
            .with_price(sym("AAA"), 10.0)
            .with_history(sym("AAA"), &[(1, 9.0), (2, 10.0)])
            .build();

        let snap = SnapshotSource::capture(&live, &[sym("AAA"), sym("ZZZ")], 30).unwrap();

        assert_eq!(snap.prices().len(), 1);
        assert_eq!(snap.histories().len(), 2);
        assert!(snap.histories()[&sym("ZZZ")].is_empty());
        assert_eq!(snap.history(sym("AAA"), 30).unwrap().len(), 2);
    }
}
