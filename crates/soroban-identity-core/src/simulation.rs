/// Simulation stage: resource preparation for writes, dry runs for reads
use crate::builder::{self, UnsignedTransaction};
use crate::client::LedgerRpc;
use crate::error::BridgeError;
use base64::Engine;
use stellar_xdr::curr::{
    Limits, ReadXdr, SorobanAuthorizationEntry, SorobanTransactionData, Transaction, TransactionEnvelope,
    TransactionExt,
};
use tracing::{debug, info, warn};

/// Transaction annotated with the simulated resource footprint, ready to sign
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransaction {
    tx: Transaction,
    network_passphrase: String,
    resource_fee: i64,
    latest_ledger: u32,
}

impl PreparedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Total fee bound: inclusion fee plus the simulated resource fee
    pub fn fee(&self) -> u32 {
        self.tx.fee
    }

    pub fn resource_fee(&self) -> i64 {
        self.resource_fee
    }

    pub fn latest_ledger(&self) -> u32 {
        self.latest_ledger
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    pub fn soroban_data(&self) -> Option<&SorobanTransactionData> {
        match &self.tx.ext {
            TransactionExt::V1(data) => Some(data),
            TransactionExt::V0 => None,
        }
    }

    pub fn to_envelope(&self) -> TransactionEnvelope {
        builder::envelope(self.tx.clone())
    }

    /// Base64 envelope handed to the signing agent
    pub fn to_xdr_base64(&self) -> Result<String, BridgeError> {
        builder::envelope_base64(&self.to_envelope())
    }
}

/// Runs transactions through the ledger's simulation endpoint
pub struct Simulator<'a, R: LedgerRpc + ?Sized> {
    rpc: &'a R,
}

impl<'a, R: LedgerRpc + ?Sized> Simulator<'a, R> {
    pub fn new(rpc: &'a R) -> Self {
        Self { rpc }
    }

    /// Simulate a write and attach the estimated resources.
    ///
    /// A contract revert comes back as `SimulationRejected` with the
    /// endpoint's message untouched; endpoint and transport trouble is a
    /// `SimulationError`.
    pub async fn prepare(&self, tx: &UnsignedTransaction) -> Result<PreparedTransaction, BridgeError> {
        let envelope = tx.to_envelope()?;
        let sim = self
            .rpc
            .simulate(&envelope)
            .await
            .map_err(|e| BridgeError::SimulationError(e.to_string()))?;

        if let Some(error) = sim.error {
            return Err(BridgeError::SimulationRejected(error));
        }

        if sim.restore_preamble.is_some() {
            warn!(
                entry_point = %tx.entry_point(),
                "Simulation requires restoring archived ledger entries first"
            );
        }

        let data_xdr = sim
            .transaction_data
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| BridgeError::SimulationError("simulation returned no transactionData".to_string()))?;
        let data: SorobanTransactionData = from_base64(data_xdr).map_err(BridgeError::SimulationError)?;

        let resource_fee = match sim.min_resource_fee.as_deref() {
            Some(fee) => fee
                .parse::<i64>()
                .map_err(|e| BridgeError::SimulationError(format!("invalid minResourceFee {}: {}", fee, e)))?,
            None => 0,
        };
        let fee = u32::try_from(resource_fee)
            .ok()
            .and_then(|r| tx.fee().checked_add(r))
            .ok_or_else(|| BridgeError::SimulationError(format!("resource fee {} out of range", resource_fee)))?;

        let auth = sim
            .auth_xdr()
            .iter()
            .map(|a| from_base64::<SorobanAuthorizationEntry>(a))
            .collect::<Result<Vec<_>, _>>()
            .map_err(BridgeError::SimulationError)?;

        debug!(
            entry_point = %tx.entry_point(),
            fee,
            resource_fee,
            auth_entries = auth.len(),
            "Assembling simulated transaction"
        );

        let assembled = tx.assemble(fee, auth, TransactionExt::V1(data))?;

        info!(entry_point = %tx.entry_point(), fee, latest_ledger = sim.latest_ledger, "Transaction prepared");

        Ok(PreparedTransaction {
            tx: assembled,
            network_passphrase: tx.network_passphrase().to_string(),
            resource_fee,
            latest_ledger: sim.latest_ledger,
        })
    }

    /// Simulate a read and return the entry point's raw return value.
    ///
    /// `Ok(None)` means the simulation succeeded without a return value. Any
    /// reported `error` is a `SimulationError`.
    pub async fn simulate_read(&self, tx: &UnsignedTransaction) -> Result<Option<String>, BridgeError> {
        let envelope = tx.to_envelope()?;
        let sim = self
            .rpc
            .simulate(&envelope)
            .await
            .map_err(|e| BridgeError::SimulationError(e.to_string()))?;

        if let Some(error) = sim.error {
            return Err(BridgeError::SimulationError(error));
        }

        let retval = sim.retval_xdr().map(str::to_string);
        debug!(entry_point = %tx.entry_point(), has_retval = retval.is_some(), "Read simulated");
        Ok(retval)
    }
}

fn from_base64<T: ReadXdr>(xdr: &str) -> Result<T, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(xdr)
        .map_err(|e| format!("Failed to decode base64 XDR: {}", e))?;
    T::from_xdr(bytes, Limits::none()).map_err(|e| format!("Failed to parse XDR: {}", e))
}
