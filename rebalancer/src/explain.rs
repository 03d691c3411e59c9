//! Natural-language explanation of a rebalance.
//!
//! The rebalancer hands the finished report plus a request to a
//! [`Summarizer`] and prints whatever text comes back. The text is opaque:
//! nothing downstream parses it.

use allocbook::RebalanceReport;

use crate::error::Result;

/// Request sent along with every report.
pub const EXPLAIN_REQUEST: &str = "In two sentences, explain why this rebalance makes sense.";

/// Turns a report into prose.
pub trait Summarizer {
    fn summarize(&self, report: &RebalanceReport, request: &str) -> Result<String>;
}

impl<T: Summarizer + ?Sized> Summarizer for &T {
    fn summarize(&self, report: &RebalanceReport, request: &str) -> Result<String> {
        (**self).summarize(report, request)
    }
}

impl<T: Summarizer + ?Sized> Summarizer for Box<T> {
    fn summarize(&self, report: &RebalanceReport, request: &str) -> Result<String> {
        (**self).summarize(report, request)
    }
}

/// Render the user prompt for `report`.
///
/// Holdings and prices are embedded as compact JSON; trades one per line in
/// the same form the CLI prints them.
pub fn build_prompt(report: &RebalanceReport, request: &str) -> Result<String> {
    let holdings = serde_json::to_string(report.holdings())?;
    let prices = serde_json::to_string(report.prices())?;
    let trades: Vec<String> = report.trades().iter().map(|t| t.to_string()).collect();

    Ok(format!(
        "I have a portfolio: {holdings}\n\
         Current prices: {prices}\n\
         I ran a mean-variance optimization (\u{3bb}={}) and generated these trades:\n\
         {}\n\n\
         {request}",
        report.risk_aversion(),
        trades.join("\n"),
    ))
}
