/// Identity registry pipelines
use crate::builder::{ContractArg, TransactionBuilder, UnsignedTransaction};
use crate::client::LedgerRpc;
use crate::codec;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, PipelineError, Stage};
use crate::identity::{IdentityLookup, IdentityRecord, IdentityRegistration, GET_IDENTITY, REGISTER_IDENTITY, VERIFY_IDENTITY};
use crate::signing::{self, SigningAgent};
use crate::simulation::Simulator;
use crate::submission;
use crate::types::{Literal, SubmissionReceipt};
use stellar_xdr::curr::ScVal;
use tracing::{error, info};

/// Client bound to one registry contract and one invoking account.
///
/// Writes go build -> prepare -> sign -> submit and reads go
/// build -> simulate -> decode. Every failure is terminal for the call and
/// tagged with its stage.
pub struct IdentityRegistryClient<R, S> {
    rpc: R,
    signer: S,
    builder: TransactionBuilder,
    source_account: String,
}

impl<R: LedgerRpc, S: SigningAgent> IdentityRegistryClient<R, S> {
    pub fn new(config: &BridgeConfig, rpc: R, signer: S, source_account: impl Into<String>) -> Result<Self, BridgeError> {
        Ok(Self {
            rpc,
            signer,
            builder: TransactionBuilder::new(config)?,
            source_account: source_account.into(),
        })
    }

    pub fn source_account(&self) -> &str {
        &self.source_account
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Register an identity for the source account
    pub async fn register_identity(
        &self,
        registration: &IdentityRegistration,
    ) -> Result<SubmissionReceipt, PipelineError> {
        let args = registration.to_args(&self.source_account);
        self.invoke(REGISTER_IDENTITY, &args).await
    }

    /// Mark `user`'s identity as verified
    pub async fn verify_identity(&self, user: &str) -> Result<SubmissionReceipt, PipelineError> {
        self.invoke(VERIFY_IDENTITY, &[ContractArg::address(user)]).await
    }

    /// Fetch `user`'s identity record
    pub async fn get_identity(&self, user: &str) -> Result<IdentityLookup, PipelineError> {
        let Some(literal) = self.query(GET_IDENTITY, &[ContractArg::address(user)]).await? else {
            info!(user, "No identity found");
            return Ok(IdentityLookup::NotFound);
        };

        let record = IdentityRecord::from_literal(&literal).map_err(|e| fail(Stage::Decoded, GET_IDENTITY, e.into()))?;
        Ok(IdentityLookup::Found(record))
    }

    /// Write path for any entry point
    pub async fn invoke(&self, entry_point: &str, args: &[ContractArg]) -> Result<SubmissionReceipt, PipelineError> {
        let unsigned = self.build(entry_point, args).await?;

        let prepared = Simulator::new(&self.rpc)
            .prepare(&unsigned)
            .await
            .map_err(|e| fail(Stage::Prepared, entry_point, e))?;
        info!(entry_point, stage = %Stage::Prepared, fee = prepared.fee(), "Pipeline advanced");

        let signed = signing::sign(&self.signer, &prepared)
            .await
            .map_err(|e| fail(Stage::Signed, entry_point, e))?;
        info!(entry_point, stage = %Stage::Signed, "Pipeline advanced");

        let receipt = submission::submit(&self.rpc, &signed)
            .await
            .map_err(|e| fail(Stage::Submitted, entry_point, e))?;
        info!(entry_point, stage = %Stage::Submitted, hash = %receipt.hash, "Pipeline advanced");

        Ok(receipt)
    }

    /// Read path for any entry point. `None` when nothing was returned.
    pub async fn query(&self, entry_point: &str, args: &[ContractArg]) -> Result<Option<Literal>, PipelineError> {
        let unsigned = self.build(entry_point, args).await?;

        let retval = Simulator::new(&self.rpc)
            .simulate_read(&unsigned)
            .await
            .map_err(|e| fail(Stage::Simulated, entry_point, e))?;
        info!(entry_point, stage = %Stage::Simulated, "Pipeline advanced");

        let Some(retval) = retval else {
            return Ok(None);
        };

        let literal = codec::decode_base64(&retval).map_err(|e| fail(Stage::Decoded, entry_point, e.into()))?;
        info!(entry_point, stage = %Stage::Decoded, value = %literal, "Pipeline advanced");

        match literal {
            Literal::Raw(ScVal::Void) => Ok(None),
            other => Ok(Some(other)),
        }
    }

    async fn build(&self, entry_point: &str, args: &[ContractArg]) -> Result<UnsignedTransaction, PipelineError> {
        let account = self
            .rpc
            .lookup_account(&self.source_account)
            .await
            .map_err(|e| fail(Stage::Built, entry_point, BridgeError::AccountLookupFailed(e.to_string())))?;

        let unsigned = self
            .builder
            .build(entry_point, args, &account)
            .map_err(|e| fail(Stage::Built, entry_point, e))?;
        info!(entry_point, stage = %Stage::Built, sequence = unsigned.sequence(), "Pipeline advanced");

        Ok(unsigned)
    }
}

fn fail(stage: Stage, entry_point: &str, error: BridgeError) -> PipelineError {
    error!(entry_point, stage = %stage, error = %error, "Pipeline failed");
    PipelineError::new(stage, error)
}
