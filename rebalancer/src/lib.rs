//! allocbook-rebalancer: mean-variance rebalancing from the command line.
//!
//! Reads share counts from a JSON file, pulls price history and quotes from a
//! market data source, computes target weights with `allocbook`, prints the
//! whole-share trades that would move the portfolio there, and asks a
//! summarizer to explain them. Every run is a dry run and is recorded in a
//! JSONL audit trail.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod explain;
pub mod openai;
pub mod portfolio;
