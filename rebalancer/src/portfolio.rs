//! Holdings file (portfolio.json) loading and validation.
//!
//! The file is a flat JSON object mapping ticker to share count:
//!
//! ```json
//! { "AAPL": 10, "MSFT": 5, "KO": 2.5 }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use allocbook::{Holdings, Symbol};

use crate::error::{Error, Result};

/// Where the current holdings come from.
pub trait HoldingsStore {
    fn load_holdings(&self) -> Result<Holdings>;
}

/// Holdings read from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct JsonPortfolioStore {
    path: PathBuf,
}

impl JsonPortfolioStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HoldingsStore for JsonPortfolioStore {
    fn load_holdings(&self) -> Result<Holdings> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| Error::PortfolioRead {
            path: self.path.clone(),
            source: e,
        })?;
        parse_portfolio(&contents)
    }
}

/// Parse and validate a portfolio document.
///
/// Tickers must be valid symbols and quantities finite and non-negative.
/// An empty portfolio is rejected.
pub fn parse_portfolio(json: &str) -> Result<Holdings> {
    // Parse keys as plain strings first so a bad ticker gets a clear message.
    let raw: BTreeMap<String, f64> =
        serde_json::from_str(json).map_err(|e| Error::Portfolio(e.to_string()))?;

    if raw.is_empty() {
        return Err(Error::Portfolio("portfolio is empty".into()));
    }

    let mut holdings = Holdings::new();
    for (ticker, qty) in raw {
        let symbol: Symbol = ticker
            .parse()
            .map_err(|_| Error::Portfolio(format!("invalid symbol '{ticker}'")))?;
        if !qty.is_finite() || qty < 0.0 {
            return Err(Error::Portfolio(format!(
                "{ticker}: quantity must be a non-negative number, got {qty}"
            )));
        }
        holdings.insert(symbol, qty);
    }
    Ok(holdings)
}
