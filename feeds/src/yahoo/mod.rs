//! Yahoo Finance price source.

pub mod client;
pub mod types;

use std::time::Duration;

use allocbook::{CurrentPrices, PriceSeries, Symbol};
use log::warn;

use crate::error::FeedError;
use crate::{trailing, PriceSource};
use client::{YahooClient, DEFAULT_BASE_URL};

/// Yahoo Finance source implementing the generic PriceSource trait.
///
/// One request per symbol, issued sequentially. Blocking (sync) via
/// reqwest::blocking.
pub struct YahooSource {
    client: YahooClient,
}

impl YahooSource {
    /// Connect to the public Yahoo endpoint.
    pub fn new() -> Result<Self, FeedError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Use a different endpoint (proxy or test server).
    pub fn with_base_url(base_url: &str) -> Result<Self, FeedError> {
        Ok(Self {
            client: YahooClient::new(base_url, Duration::from_secs(30))?,
        })
    }
}

impl PriceSource for YahooSource {
    fn current_prices(&self, symbols: &[Symbol]) -> Result<CurrentPrices, FeedError> {
        let mut prices = CurrentPrices::new();
        for &symbol in symbols {
            let chart = self.client.chart(symbol.as_str(), "1d", "1m")?;
            match chart.and_then(|c| c.last_price()) {
                Some(price) => {
                    prices.insert(symbol, price);
                }
                None => warn!("{symbol}: no current price from Yahoo"),
            }
        }
        Ok(prices)
    }

    fn history(&self, symbol: Symbol, lookback: usize) -> Result<PriceSeries, FeedError> {
        let range = format!("{lookback}d");
        let Some(chart) = self.client.chart(symbol.as_str(), &range, "1d")? else {
            warn!("{symbol}: unknown to Yahoo");
            return Ok(PriceSeries::empty());
        };
        PriceSeries::new(trailing(&chart.daily_closes(), lookback))
            .map_err(|e| FeedError::Parse(format!("{symbol}: {e}")))
    }
}
