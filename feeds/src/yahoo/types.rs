//! Yahoo Finance chart API response types.

use serde::Deserialize;

const SECONDS_PER_DAY: i64 = 86_400;

/// Top-level `/v8/finance/chart/{symbol}` response.
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

/// Error object Yahoo returns in place of a result.
#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl ChartError {
    /// Yahoo's way of saying the ticker does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code.eq_ignore_ascii_case("Not Found")
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    /// Exchange offset from UTC, in seconds.
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteBlock {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartResult {
    /// Daily closes keyed by exchange-local midnight (as seconds since the
    /// epoch), so bars from different exchanges line up by trading date.
    ///
    /// Null closes are dropped. If Yahoo repeats a date, the later bar wins.
    pub fn daily_closes(&self) -> Vec<(i64, f64)> {
        let Some(quote) = self.indicators.quote.first() else {
            return Vec::new();
        };

        let mut out: Vec<(i64, f64)> = Vec::with_capacity(self.timestamp.len());
        for (&ts, close) in self.timestamp.iter().zip(&quote.close) {
            let Some(close) = *close else { continue };
            let day = (ts + self.meta.gmtoffset).div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY;
            match out.last_mut() {
                Some(last) if last.0 == day => last.1 = close,
                Some(last) if last.0 > day => continue,
                _ => out.push((day, close)),
            }
        }
        out
    }

    /// Latest traded price: `regularMarketPrice`, else the last non-null close.
    pub fn last_price(&self) -> Option<f64> {
        self.meta.regular_market_price.or_else(|| {
            self.indicators
                .quote
                .first()
                .and_then(|q| q.close.iter().rev().find_map(|c| *c))
        })
    }
}
