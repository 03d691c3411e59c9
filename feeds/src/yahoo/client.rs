//! Yahoo Finance chart API client.

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;

use super::types::{ChartResponse, ChartResult};
use crate::error::FeedError;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = concat!("allocbook/", env!("CARGO_PKG_VERSION"));

/// Blocking Yahoo Finance client.
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch a chart (GET /v8/finance/chart/{symbol}).
    ///
    /// Returns `Ok(None)` when Yahoo does not know the symbol.
    pub fn chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Option<ChartResult>, FeedError> {
        let url = format!(
            "{}/v8/finance/chart/{symbol}?range={range}&interval={interval}",
            self.base_url
        );
        debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FeedError::Connection(format!("chart request for {symbol} failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimit);
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(FeedError::Connection(format!(
                "chart for {symbol} returned {status}: {body}"
            )));
        }

        let body = resp
            .json::<ChartResponse>()
            .map_err(|e| FeedError::Parse(format!("chart for {symbol}: {e}")))?;
        first_result(body)
    }
}

/// Unwrap the single result of a chart response.
pub fn first_result(body: ChartResponse) -> Result<Option<ChartResult>, FeedError> {
    if let Some(err) = body.chart.error {
        if err.is_not_found() {
            return Ok(None);
        }
        return Err(FeedError::Parse(format!("{}: {}", err.code, err.description)));
    }
    Ok(body.chart.result.and_then(|r| r.into_iter().next()))
}
