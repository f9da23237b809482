use async_trait::async_trait;
use ethereum_types::H160;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::HistoryConfig,
    error::{Error, Result},
};

/// EVM chain id, e.g. 1 for mainnet or 97 for BSC testnet.
pub type NetworkId = u64;

/// A transaction as listed by the history indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    #[serde(rename = "from_address")]
    pub from: String,
    /// Absent for contract creations.
    #[serde(rename = "to_address")]
    pub to: Option<String>,
    /// Call data as `0x` hex.
    pub input: String,
    pub value: String,
    #[serde(rename = "gas")]
    pub gas_limit: String,
    #[serde(rename = "receipt_status")]
    pub status_flag: Option<String>,
}

/// Source of the transactions that touched an address, most recent first.
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    async fn fetch(&self, network: NetworkId, address: &H160) -> Result<Vec<TransactionRecord>>;
}

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    result: Vec<TransactionRecord>,
}

/// [`TransactionHistory`] backed by the Moralis wallet transactions endpoint.
///
/// Only the first page is fetched. Any failure surfaces as
/// [`Error::Provider`]; the cause is logged.
#[derive(Debug, Clone)]
pub struct MoralisClient {
    config: HistoryConfig,
    http: reqwest::Client,
}

impl MoralisClient {
    pub fn new(config: HistoryConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            http: reqwest::Client::new(),
        })
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn url(&self, address: &H160) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            hex_address(address)
        )
    }
}

#[async_trait]
impl TransactionHistory for MoralisClient {
    async fn fetch(&self, network: NetworkId, address: &H160) -> Result<Vec<TransactionRecord>> {
        let chain = format!("{:#x}", network);

        debug!(%chain, address = %hex_address(address), "fetching transaction history");

        let response = self
            .http
            .get(self.url(address))
            .header("X-API-Key", &self.config.api_key)
            .query(&[("chain", chain.as_str()), ("order", "DESC")])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(error = %e, "transaction history request failed");
                Error::Provider
            })?;

        let page: HistoryPage = response.json().await.map_err(|e| {
            warn!(error = %e, "malformed transaction history response");
            Error::Provider
        })?;

        debug!(records = page.result.len(), "fetched transaction history");

        Ok(page.result)
    }
}

pub(crate) fn hex_address(address: &H160) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}
