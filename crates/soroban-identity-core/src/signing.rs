/// Signing handoff to an external wallet agent
use crate::error::BridgeError;
use crate::simulation::PreparedTransaction;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use stellar_xdr::curr::{Limits, ReadXdr, TransactionEnvelope};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SigningError {
    #[error("Signing agent declined: {0}")]
    Declined(String),
    #[error("Signing agent unavailable: {0}")]
    Unavailable(String),
    #[error("Signing agent returned an invalid envelope: {0}")]
    InvalidEnvelope(String),
}

/// External holder of the signing keys.
///
/// Receives a base64 prepared envelope plus the network passphrase and
/// returns a base64 signed envelope. Implementations own all key material.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    async fn sign(&self, prepared_xdr: &str, network_passphrase: &str) -> Result<String, SigningError>;
}

#[async_trait]
impl<T: SigningAgent + ?Sized> SigningAgent for Box<T> {
    async fn sign(&self, prepared_xdr: &str, network_passphrase: &str) -> Result<String, SigningError> {
        (**self).sign(prepared_xdr, network_passphrase).await
    }
}

/// Signed envelope as returned by the agent; opaque beyond being submittable
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    envelope: TransactionEnvelope,
    xdr: String,
}

impl SignedEnvelope {
    pub fn from_xdr_base64(xdr: &str) -> Result<Self, SigningError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(xdr.trim())
            .map_err(|e| SigningError::InvalidEnvelope(e.to_string()))?;
        let envelope = TransactionEnvelope::from_xdr(bytes, Limits::none())
            .map_err(|e| SigningError::InvalidEnvelope(e.to_string()))?;

        Ok(Self {
            envelope,
            xdr: xdr.trim().to_string(),
        })
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn xdr(&self) -> &str {
        &self.xdr
    }

    pub fn signature_count(&self) -> usize {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.signatures.len(),
            TransactionEnvelope::Tx(env) => env.signatures.len(),
            TransactionEnvelope::TxFeeBump(env) => env.signatures.len(),
        }
    }
}

/// Ask the agent for a signature exactly once
pub async fn sign<S: SigningAgent + ?Sized>(
    agent: &S,
    prepared: &PreparedTransaction,
) -> Result<SignedEnvelope, BridgeError> {
    let xdr = prepared.to_xdr_base64()?;

    debug!(fee = prepared.fee(), "Requesting signature from agent");

    let signed = agent
        .sign(&xdr, prepared.network_passphrase())
        .await
        .map_err(|e| BridgeError::SigningRejected(e.to_string()))?;

    let envelope = SignedEnvelope::from_xdr_base64(&signed).map_err(|e| BridgeError::SigningRejected(e.to_string()))?;

    info!(signatures = envelope.signature_count(), "Transaction signed");

    Ok(envelope)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    #[serde(default)]
    signed_tx_xdr: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Wallet bridge reachable over HTTP.
///
/// POSTs `{"xdr", "networkPassphrase"}` and expects `{"signedTxXdr"}` or
/// `{"error"}` back.
#[derive(Debug, Clone)]
pub struct HttpSigningAgent {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSigningAgent {
    pub fn new(endpoint: &str) -> Self {
        // Generous timeout: a person may be reviewing the request.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.to_string(),
            client,
        }
    }
}

#[async_trait]
impl SigningAgent for HttpSigningAgent {
    async fn sign(&self, prepared_xdr: &str, network_passphrase: &str) -> Result<String, SigningError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "xdr": prepared_xdr, "networkPassphrase": network_passphrase }))
            .send()
            .await
            .map_err(|e| SigningError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| SigningError::Unavailable(format!("HTTP {}: {}", status, e)))?;

        if let Some(error) = body.error {
            let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Err(SigningError::Declined(message));
        }

        body.signed_tx_xdr
            .ok_or_else(|| SigningError::Declined(format!("HTTP {}: no signed transaction returned", status)))
    }
}

/// Agent used when no wallet is configured; declines every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigningAgent;

#[async_trait]
impl SigningAgent for NoSigningAgent {
    async fn sign(&self, _prepared_xdr: &str, _network_passphrase: &str) -> Result<String, SigningError> {
        Err(SigningError::Unavailable("no signing agent configured".to_string()))
    }
}
