//! Configuration for the components that reach the network.
//!
//! Values are passed explicitly to the client that needs them; nothing here
//! is global.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default endpoint of the transaction history indexer.
pub const DEFAULT_HISTORY_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Settings for the transaction history indexer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub base_url: String,
    pub api_key: String,
}

impl HistoryConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_HISTORY_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Reads `MORALIS_API_KEY` and, when set, `MORALIS_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("MORALIS_API_KEY")
            .map_err(|_| Error::Config("MORALIS_API_KEY is not set".to_string()))?;

        let config = match std::env::var("MORALIS_BASE_URL") {
            Ok(url) => Self::new(api_key).with_base_url(url),
            Err(_) => Self::new(api_key),
        };
        config.validate()?;

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.base_url)?;

        if self.api_key.trim().is_empty() {
            return Err(Error::Config(
                "API key cannot be empty or whitespace".to_string(),
            ));
        }

        Ok(())
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for HistoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Settings for a JSON-RPC node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Reads `ETH_RPC_URL`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("ETH_RPC_URL")
            .map_err(|_| Error::Config("ETH_RPC_URL is not set".to_string()))?;

        let config = Self::new(url);
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.url)
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::Config("URL cannot be empty".to_string()));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::Config(format!(
            "URL must start with http:// or https://, got `{}`",
            url
        )));
    }

    Ok(())
}
