//! Wallet Configuration
//!
//! Loaded from `~/.gluon-wallet/config.toml` unless `--config` names another
//! file. See `gluon.example.toml` for a complete example.

use crate::error::WalletError;
use anyhow::{Context, Result};
use gluon_reactor::{ProtocolConfig, ReactorError};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Base URL of an Ergo node with the blockchain indexer enabled
    #[serde(default)]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    25
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl WalletConfig {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Check everything a network call needs before making one.
    pub fn validate(&self) -> Result<(), WalletError> {
        let url = self.node.url.trim();
        if url.is_empty() {
            return Err(WalletError::Configuration("node.url is not set".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(WalletError::Configuration(format!(
                "node.url must be an http(s) URL: {url}"
            )));
        }
        if self.node.timeout_secs == 0 {
            return Err(WalletError::Configuration(
                "node.timeout_secs must be positive".to_string(),
            ));
        }
        self.protocol.validate().map_err(|e| match e {
            ReactorError::Configuration(msg) => WalletError::Configuration(msg),
            other => other.into(),
        })
    }
}

/// Get the default config directory path
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gluon-wallet"))
}

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    default_data_dir().map(|dir| dir.join("config.toml"))
}
