/// Submission of signed envelopes and reporting of the network's answer
use crate::client::LedgerRpc;
use crate::error::BridgeError;
use crate::signing::SignedEnvelope;
use crate::types::{SendStatus, SubmissionReceipt};
use tracing::{info, warn};

/// Send a signed envelope once.
///
/// Succeeds as soon as the network acknowledges receipt (`PENDING` or
/// `DUPLICATE`); inclusion in a ledger is not awaited.
pub async fn submit<R: LedgerRpc + ?Sized>(
    rpc: &R,
    signed: &SignedEnvelope,
) -> Result<SubmissionReceipt, BridgeError> {
    let response = rpc
        .submit(signed.envelope())
        .await
        .map_err(|e| BridgeError::SubmissionFailed {
            status: "TRANSPORT".to_string(),
            detail: e.to_string(),
        })?;

    match response.status {
        SendStatus::Pending | SendStatus::Duplicate => {
            info!(
                hash = %response.hash,
                status = %response.status,
                latest_ledger = response.latest_ledger,
                "Transaction submitted"
            );
            Ok(SubmissionReceipt {
                hash: response.hash,
                status: response.status,
                latest_ledger: response.latest_ledger,
            })
        }
        SendStatus::TryAgainLater | SendStatus::Error => {
            warn!(hash = %response.hash, status = %response.status, "Network rejected transaction");
            Err(BridgeError::SubmissionFailed {
                status: response.status.to_string(),
                detail: response
                    .error_result_xdr
                    .unwrap_or_else(|| format!("transaction {} not accepted", response.hash)),
            })
        }
    }
}
