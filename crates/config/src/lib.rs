//! SoroShark Configuration Module
//!
//! This module provides configuration types for the campaign watcher: the RPC
//! endpoint, synchronizer tuning, the monitored contracts and logging. Every
//! section is optional in the TOML file and falls back to the defaults below.
//!
//! ```toml
//! [rpc]
//! url = "https://soroban-testnet.stellar.org"
//!
//! [campaign]
//! token_contract = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC"
//! crowdfund_contract = "CCWF3CQK5G5IFGCVGUQDOCZM3A5X6MHZ3H6BLGBCKDLDW2TNGHLZYXRR"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Default JSON-RPC endpoint
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8000/rpc";
/// Default per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Default budget for one contract read inside a batch
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 15_000;
/// Default number of delta event ids remembered per contract group
pub const DEFAULT_DEDUP_WINDOW: usize = 256;
/// Default capacity of the notification broadcast channel
pub const DEFAULT_EVENT_BUFFER: usize = 1024;
/// Default log filter directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid rpc url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub sync: SyncConfig,
    pub campaign: CampaignConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration from TOML text without validating it.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        self.rpc.endpoint()?;
        if self.rpc.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("rpc.request_timeout_ms must be positive".into()));
        }
        if self.sync.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid("sync.read_timeout_ms must be positive".into()));
        }
        if self.sync.event_buffer == 0 {
            return Err(ConfigError::Invalid("sync.event_buffer must be positive".into()));
        }
        if self.campaign.token_contract.trim().is_empty() {
            return Err(ConfigError::Invalid("campaign.token_contract is required".into()));
        }
        if self.campaign.crowdfund_contract.trim().is_empty() {
            return Err(ConfigError::Invalid("campaign.crowdfund_contract is required".into()));
        }
        Ok(())
    }
}

/// RPC endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Basic auth user
    pub user: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// HTTP request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl RpcConfig {
    /// The parsed endpoint URL.
    pub fn endpoint(&self) -> ConfigResult<Url> {
        Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            user: None,
            password: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

/// View synchronizer tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// A contract read taking longer than this fails the whole batch
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Delta event ids remembered per contract group for duplicate suppression
    #[serde(default = "default_dedup_window")]
    pub dedup_window: usize,

    /// Capacity of the notification broadcast channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Contracts backing the campaign view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Equity token contract (balance, decimals, name, symbol)
    pub token_contract: String,

    /// Crowdfund contract (deadline, target, pledge events)
    pub crowdfund_contract: String,

    /// Connected backer account, if any
    pub backer: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

const fn default_dedup_window() -> usize {
    DEFAULT_DEDUP_WINDOW
}

const fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
