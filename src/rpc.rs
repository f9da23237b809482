use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ethereum_types::H160;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    coerce::parse_address,
    config::RpcConfig,
    contract::CallTransport,
    error::{Error, Result},
    history::hex_address,
};

/// Transaction fields returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub hash: String,
    pub from: String,
    /// Absent for contract creations.
    pub to: Option<String>,
    pub input: String,
    pub value: String,
    pub gas: String,
    pub nonce: String,
    /// Absent while pending.
    pub block_number: Option<String>,
}

/// Receipt fields returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    pub gas_used: String,
    /// `0x1` on success, `0x0` on revert. Missing on pre-Byzantium receipts.
    pub status: Option<String>,
    pub contract_address: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

/// Read access to chain state.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Deployed bytecode at `address`, empty for externally owned accounts.
    async fn code_at(&self, address: &H160) -> Result<Vec<u8>>;

    async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>>;

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>>;
}

/// Whether `address` holds contract code. Malformed addresses are never
/// contracts and are not looked up.
pub async fn is_contract_address<R: ChainReader + ?Sized>(reader: &R, address: &str) -> Result<bool> {
    match parse_address(address) {
        Ok(address) => Ok(!reader.code_at(&address).await?.is_empty()),
        Err(_) => Ok(false),
    }
}

/// Whether `address` is an externally owned account, i.e. a well formed
/// address without code.
pub async fn is_wallet_address<R: ChainReader + ?Sized>(reader: &R, address: &str) -> Result<bool> {
    match parse_address(address) {
        Ok(address) => Ok(reader.code_at(&address).await?.is_empty()),
        Err(_) => Ok(false),
    }
}

pub async fn get_transaction<R: ChainReader + ?Sized>(reader: &R, hash: &str) -> Result<ChainTransaction> {
    reader
        .transaction(hash)
        .await?
        .ok_or_else(|| Error::NotFound(format!("transaction {}", hash)))
}

pub async fn get_transaction_receipt<R: ChainReader + ?Sized>(
    reader: &R,
    hash: &str,
) -> Result<TransactionReceipt> {
    reader
        .transaction_receipt(hash)
        .await?
        .ok_or_else(|| Error::NotFound(format!("receipt for transaction {}", hash)))
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client for an Ethereum node.
#[derive(Debug)]
pub struct JsonRpcClient {
    config: RpcConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(config: RpcConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Sends one request. A `null` result comes back as `None`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        debug!(method, id, "json-rpc request");

        let response = self
            .http
            .post(&self.config.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(method, error = %e, "json-rpc transport failure");
                Error::Rpc(format!("{} failed: {}", method, e))
            })?;

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{} returned a malformed response: {}", method, e)))?;

        if let Some(err) = body.error {
            warn!(method, code = err.code, message = %err.message, "json-rpc error response");
            return Err(Error::Rpc(format!("{} error {}: {}", method, err.code, err.message)));
        }

        Ok(body.result)
    }

    async fn request_bytes(&self, method: &str, params: serde_json::Value) -> Result<Vec<u8>> {
        let data: String = self
            .request(method, params)
            .await?
            .ok_or_else(|| Error::Rpc(format!("{} returned no result", method)))?;

        decode_hex_data(method, &data)
    }
}

fn decode_hex_data(method: &str, data: &str) -> Result<Vec<u8>> {
    let digits = data.strip_prefix("0x").unwrap_or(data);

    hex::decode(digits).map_err(|e| Error::Rpc(format!("{} returned invalid hex: {}", method, e)))
}

#[async_trait]
impl ChainReader for JsonRpcClient {
    async fn code_at(&self, address: &H160) -> Result<Vec<u8>> {
        self.request_bytes("eth_getCode", json!([hex_address(address), "latest"]))
            .await
    }

    async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>> {
        self.request("eth_getTransactionByHash", json!([hash])).await
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }
}

#[async_trait]
impl CallTransport for JsonRpcClient {
    async fn call(&self, to: &H160, data: &[u8]) -> Result<Vec<u8>> {
        self.request_bytes(
            "eth_call",
            json!([
                {
                    "to": hex_address(to),
                    "data": format!("0x{}", hex::encode(data)),
                },
                "latest"
            ]),
        )
        .await
    }
}
