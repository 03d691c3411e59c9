//! TOML configuration loading and validation.
//!
//! Every section and field is optional; an absent config file means all
//! defaults.

use std::path::{Path, PathBuf};

use allocbook::{CleanerConfig, OptimizerConfig, PlannerConfig, RebalanceConfig, Rounding};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub optimizer: OptimizerSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerSection {
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            risk_aversion: default_risk_aversion(),
            max_weight: default_max_weight(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_risk_aversion() -> f64 {
    allocbook::DEFAULT_RISK_AVERSION
}
fn default_max_weight() -> f64 {
    1.0
}
fn default_max_iterations() -> usize {
    OptimizerConfig::default().max_iterations
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    /// Trading days of history to fetch and optimize over.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
        }
    }
}

fn default_lookback() -> usize {
    allocbook::DEFAULT_LOOKBACK
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerSection {
    #[serde(default)]
    pub rounding: Rounding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Snapshot,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub source: SourceKind,
    /// Snapshot file, required when `source = "snapshot"`.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_tokens() -> u32 {
    100
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        self.rebalance_config()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        if self.data.source == SourceKind::Snapshot && self.data.snapshot.is_none() {
            return Err(Error::Config(
                "data.snapshot must be set when data.source = \"snapshot\"".into(),
            ));
        }
        if self.summarizer.max_tokens == 0 {
            return Err(Error::Config("summarizer.max_tokens must be > 0".into()));
        }
        if self.summarizer.model.trim().is_empty() {
            return Err(Error::Config("summarizer.model must not be empty".into()));
        }
        if self.summarizer.timeout_secs == 0 {
            return Err(Error::Config("summarizer.timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Core pipeline settings.
    pub fn rebalance_config(&self) -> RebalanceConfig {
        RebalanceConfig {
            cleaner: CleanerConfig {
                lookback: Some(self.history.lookback),
            },
            optimizer: OptimizerConfig {
                risk_aversion: self.optimizer.risk_aversion,
                max_weight: self.optimizer.max_weight,
                max_iterations: self.optimizer.max_iterations,
                ..OptimizerConfig::default()
            },
            planner: PlannerConfig {
                rounding: self.planner.rounding,
            },
        }
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
