/// Transaction builder for contract invocations
use crate::codec;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::types::{AccountSnapshot, Literal};
use base64::Engine;
use std::str::FromStr;
use stellar_xdr::curr::{
    AccountId, HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Limits, Memo, MuxedAccount, Operation,
    OperationBody, Preconditions, PublicKey, ScAddress, ScVal, SequenceNumber, SorobanAuthorizationEntry, TimeBounds,
    TimePoint, Transaction, TransactionEnvelope, TransactionExt, TransactionV1Envelope, VecM, WriteXdr,
};
use tracing::debug;

/// One positional argument of a contract call
#[derive(Debug, Clone, PartialEq)]
pub enum ContractArg {
    /// Account (`G...`) or contract (`C...`) strkey
    Address(String),
    Value(Literal),
}

impl ContractArg {
    pub fn address(strkey: impl Into<String>) -> Self {
        ContractArg::Address(strkey.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        ContractArg::Value(Literal::String(s.into()))
    }

    pub fn to_scval(&self) -> Result<ScVal, BridgeError> {
        match self {
            ContractArg::Address(strkey) => ScAddress::from_str(strkey)
                .map(ScVal::Address)
                .map_err(|e| BridgeError::InvalidArgument(format!("invalid address {}: {}", strkey, e))),
            ContractArg::Value(literal) => {
                codec::encode(literal).map_err(|e| BridgeError::InvalidArgument(e.to_string()))
            }
        }
    }
}

/// A single contract invocation that has not been simulated or signed.
///
/// Built fresh for every call; the sequence number it carries is consumed
/// once the envelope is applied, so it cannot be reused.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    source: MuxedAccount,
    source_account: String,
    sequence: i64,
    fee: u32,
    time_bounds: TimeBounds,
    invocation: InvokeContractArgs,
    network_passphrase: String,
}

impl UnsignedTransaction {
    pub fn entry_point(&self) -> String {
        String::from_utf8_lossy(self.invocation.function_name.0.as_slice()).to_string()
    }

    pub fn args(&self) -> &[ScVal] {
        self.invocation.args.as_slice()
    }

    pub fn source_account(&self) -> &str {
        &self.source_account
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    pub fn fee(&self) -> u32 {
        self.fee
    }

    pub fn time_bounds(&self) -> &TimeBounds {
        &self.time_bounds
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    /// Ledger transaction with the given fee, authorization and resource data
    pub(crate) fn assemble(
        &self,
        fee: u32,
        auth: Vec<SorobanAuthorizationEntry>,
        ext: TransactionExt,
    ) -> Result<Transaction, BridgeError> {
        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(self.invocation.clone()),
                auth: auth.try_into()?,
            }),
        };

        Ok(Transaction {
            source_account: self.source.clone(),
            fee,
            seq_num: SequenceNumber(self.sequence),
            cond: Preconditions::Time(self.time_bounds.clone()),
            memo: Memo::None,
            operations: vec![operation].try_into()?,
            ext,
        })
    }

    pub fn to_transaction(&self) -> Result<Transaction, BridgeError> {
        self.assemble(self.fee, Vec::new(), TransactionExt::V0)
    }

    /// Unsigned envelope, the form the simulation endpoint accepts
    pub fn to_envelope(&self) -> Result<TransactionEnvelope, BridgeError> {
        Ok(envelope(self.to_transaction()?))
    }

    pub fn to_xdr_base64(&self) -> Result<String, BridgeError> {
        envelope_base64(&self.to_envelope()?)
    }
}

pub(crate) fn envelope(tx: Transaction) -> TransactionEnvelope {
    TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: VecM::default(),
    })
}

pub(crate) fn envelope_base64(envelope: &TransactionEnvelope) -> Result<String, BridgeError> {
    let bytes = envelope.to_xdr(Limits::none())?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Builds invocations of one contract on one network
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    contract: ScAddress,
    network_passphrase: String,
    base_fee: u32,
    timeout_secs: u64,
}

impl TransactionBuilder {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let contract = ScAddress::from_str(&config.contract_id)
            .map_err(|e| BridgeError::InvalidArgument(format!("invalid contract id {}: {}", config.contract_id, e)))?;

        Ok(Self {
            contract,
            network_passphrase: config.network_passphrase.clone(),
            base_fee: config.base_fee,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build an invocation of `entry_point` expiring `timeout_secs` from now
    pub fn build(
        &self,
        entry_point: &str,
        args: &[ContractArg],
        source: &AccountSnapshot,
    ) -> Result<UnsignedTransaction, BridgeError> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.build_at(entry_point, args, source, now)
    }

    /// Same as [`build`](Self::build) with an explicit current time (unix seconds)
    pub fn build_at(
        &self,
        entry_point: &str,
        args: &[ContractArg],
        source: &AccountSnapshot,
        now: u64,
    ) -> Result<UnsignedTransaction, BridgeError> {
        let AccountId(PublicKey::PublicKeyTypeEd25519(key)) = AccountId::from_str(&source.account_id)
            .map_err(|e| BridgeError::InvalidArgument(format!("invalid source account {}: {}", source.account_id, e)))?;

        let sequence = source
            .sequence
            .checked_add(1)
            .ok_or_else(|| BridgeError::InvalidArgument("source account sequence exhausted".to_string()))?;

        let function_name =
            codec::sc_symbol(entry_point).map_err(|e| BridgeError::InvalidArgument(e.to_string()))?;

        let args = args.iter().map(ContractArg::to_scval).collect::<Result<Vec<_>, _>>()?;

        debug!(entry_point, args = args.len(), sequence, "Building contract invocation");

        Ok(UnsignedTransaction {
            source: MuxedAccount::Ed25519(key),
            source_account: source.account_id.clone(),
            sequence,
            fee: self.base_fee,
            time_bounds: TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(now.saturating_add(self.timeout_secs)),
            },
            invocation: InvokeContractArgs {
                contract_address: self.contract.clone(),
                function_name,
                args: args.try_into()?,
            },
            network_passphrase: self.network_passphrase.clone(),
        })
    }
}
