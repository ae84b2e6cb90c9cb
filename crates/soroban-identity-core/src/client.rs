/// Stellar RPC client for account lookup, simulation and submission
use crate::config::BridgeConfig;
use crate::types::{AccountSnapshot, LatestLedger, SendTransactionResponse, SimulateResponse};
use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use stellar_xdr::curr::{
    AccountId, LedgerEntryData, LedgerKey, LedgerKeyAccount, Limits, ReadXdr, TransactionEnvelope, WriteXdr,
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("RPC returned error: {0}")]
    Rpc(String),
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Network timeout")]
    Timeout,
}

/// The three ledger calls the registry pipelines depend on
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Current sequence number of an account
    async fn lookup_account(&self, account_id: &str) -> Result<AccountSnapshot, RpcError>;

    /// Dry-run a transaction against current ledger state
    async fn simulate(&self, envelope: &TransactionEnvelope) -> Result<SimulateResponse, RpcError>;

    /// Hand a signed envelope to the network
    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SendTransactionResponse, RpcError>;
}

/// Client for communicating with Stellar RPC
#[derive(Debug, Clone)]
pub struct StellarRpcClient {
    pub endpoint: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl StellarRpcClient {
    /// Create a new RPC client with the given endpoint
    pub fn new(endpoint: &str) -> Self {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.to_string(),
            client,
            max_retries: 3,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::with_timeout(&config.rpc_endpoint, Duration::from_secs(config.request_timeout_secs))
    }

    /// Disable transport retries on the status helpers
    pub fn without_retry(mut self) -> Self {
        self.max_retries = 0;
        self
    }

    /// Get the latest ledger known to the endpoint
    pub async fn get_latest_ledger(&self) -> Result<LatestLedger, RpcError> {
        let value = self.jsonrpc_call("getLatestLedger", json!({}), self.max_retries).await?;
        serde_json::from_value(value)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse getLatestLedger response: {}", e)))
    }

    /// Endpoint health status, e.g. "healthy"
    pub async fn get_health(&self) -> Result<String, RpcError> {
        let value = self.jsonrpc_call("getHealth", json!({}), self.max_retries).await?;
        value
            .get("status")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| RpcError::InvalidResponse("Missing status in getHealth response".to_string()))
    }

    /// Internal JSON-RPC 2.0 call. Only transport failures are retried.
    async fn jsonrpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
        max_retries: u32,
    ) -> Result<serde_json::Value, RpcError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": if params.is_null() { json!({}) } else { params }
        });

        let mut retries = 0u32;

        loop {
            debug!(method, attempt = retries + 1, "Sending JSON-RPC request");

            match self
                .client
                .post(&self.endpoint)
                .header("Content-Type", "application/json")
                .json(&request_body)
                .send()
                .await
            {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(RpcError::RequestFailed(format!(
                            "HTTP {}: {}",
                            response.status(),
                            response.text().await.unwrap_or_default()
                        )));
                    }

                    let result = response
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

                    if let Some(error) = result.get("error") {
                        let message = error
                            .get("message")
                            .and_then(|m| m.as_str())
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| error.to_string());
                        return Err(RpcError::Rpc(message));
                    }

                    return result
                        .get("result")
                        .cloned()
                        .ok_or_else(|| RpcError::InvalidResponse("No result in RPC response".to_string()));
                }
                Err(e) if retries < max_retries => {
                    retries += 1;
                    let backoff = Duration::from_millis(100 * 2_u64.pow(retries - 1));
                    warn!(method, attempt = retries, error = %e, "RPC transport failure, backing off");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) if e.is_timeout() => return Err(RpcError::Timeout),
                Err(e) => return Err(RpcError::RequestFailed(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for StellarRpcClient {
    async fn lookup_account(&self, account_id: &str) -> Result<AccountSnapshot, RpcError> {
        let account = AccountId::from_str(account_id)
            .map_err(|e| RpcError::InvalidResponse(format!("Invalid account id {}: {}", account_id, e)))?;
        let key = LedgerKey::Account(LedgerKeyAccount { account_id: account });

        let value = self
            .jsonrpc_call("getLedgerEntries", json!({ "keys": [xdr_base64(&key)?] }), 0)
            .await?;

        let entry_xdr = value
            .get("entries")
            .and_then(|v| v.as_array())
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("xdr"))
            .and_then(|xdr| xdr.as_str())
            .ok_or_else(|| RpcError::NotFound(format!("Account {} does not exist", account_id)))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(entry_xdr)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to decode base64 XDR: {}", e)))?;

        match LedgerEntryData::from_xdr(bytes, Limits::none()) {
            Ok(LedgerEntryData::Account(entry)) => Ok(AccountSnapshot {
                account_id: account_id.to_string(),
                sequence: entry.seq_num.0,
            }),
            Ok(other) => Err(RpcError::InvalidResponse(format!(
                "Expected an account entry, got {}",
                other.name()
            ))),
            Err(e) => Err(RpcError::InvalidResponse(format!("Failed to parse XDR: {}", e))),
        }
    }

    async fn simulate(&self, envelope: &TransactionEnvelope) -> Result<SimulateResponse, RpcError> {
        let value = self
            .jsonrpc_call("simulateTransaction", json!({ "transaction": xdr_base64(envelope)? }), 0)
            .await?;

        serde_json::from_value(value)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse simulateTransaction response: {}", e)))
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SendTransactionResponse, RpcError> {
        let value = self
            .jsonrpc_call("sendTransaction", json!({ "transaction": xdr_base64(envelope)? }), 0)
            .await?;

        serde_json::from_value(value)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse sendTransaction response: {}", e)))
    }
}

fn xdr_base64<T: WriteXdr>(value: &T) -> Result<String, RpcError> {
    let bytes = value
        .to_xdr(Limits::none())
        .map_err(|e| RpcError::InvalidResponse(format!("Failed to encode XDR: {}", e)))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}
