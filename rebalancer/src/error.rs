//! Error types for the rebalancer.

use std::path::PathBuf;

use allocbook_feeds::FeedError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("portfolio file error: {0}")]
    Portfolio(String),

    #[error("failed to read portfolio file {path}: {source}")]
    PortfolioRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("market data error: {0}")]
    Feed(#[from] FeedError),

    #[error("{0}")]
    Rebalance(#[from] allocbook::Error),

    #[error("summarizer error: {0}")]
    Summarizer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// True when the core refused to produce a plan for the portfolio as a
    /// whole (as opposed to bad input or a failing collaborator).
    pub fn is_rebalance_abort(&self) -> bool {
        matches!(
            self,
            Error::Rebalance(
                allocbook::Error::EmptyUniverse
                    | allocbook::Error::Optimization(_)
                    | allocbook::Error::ZeroPortfolioValue(_)
                    | allocbook::Error::InsufficientHistory(_)
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
