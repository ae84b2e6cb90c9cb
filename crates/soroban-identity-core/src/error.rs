/// Error taxonomy for the registry pipelines
use crate::codec::CodecError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Pipeline stage a failure is attributed to.
///
/// Write calls move `Built -> Prepared -> Signed -> Submitted`; read calls
/// move `Built -> Simulated -> Decoded`. A failure carries the stage that
/// was being entered when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Built,
    Prepared,
    Signed,
    Submitted,
    Simulated,
    Decoded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Built => write!(f, "Built"),
            Stage::Prepared => write!(f, "Prepared"),
            Stage::Signed => write!(f, "Signed"),
            Stage::Submitted => write!(f, "Submitted"),
            Stage::Simulated => write!(f, "Simulated"),
            Stage::Decoded => write!(f, "Decoded"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Account lookup failed: {0}")]
    AccountLookupFailed(String),
    #[error("Invalid contract argument: {0}")]
    InvalidArgument(String),
    #[error("Simulation rejected: {0}")]
    SimulationRejected(String),
    #[error("Simulation error: {0}")]
    SimulationError(String),
    #[error("Signing rejected: {0}")]
    SigningRejected(String),
    #[error("Submission failed ({status}): {detail}")]
    SubmissionFailed { status: String, detail: String },
    #[error("Unsupported variant: {0}")]
    DecodeUnsupportedVariant(String),
    #[error("XDR error: {0}")]
    Xdr(String),
}

impl From<stellar_xdr::curr::Error> for BridgeError {
    fn from(e: stellar_xdr::curr::Error) -> Self {
        BridgeError::Xdr(e.to_string())
    }
}

impl From<CodecError> for BridgeError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnsupportedVariant(msg) => BridgeError::DecodeUnsupportedVariant(msg),
            CodecError::Base64(msg) | CodecError::Xdr(msg) => BridgeError::Xdr(msg),
        }
    }
}

/// Terminal `Failed@<stage>` state of one pipeline call.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub error: BridgeError,
}

impl PipelineError {
    pub fn new(stage: Stage, error: BridgeError) -> Self {
        Self { stage, error }
    }

    /// Whether the caller may resubmit the same request without changing it.
    ///
    /// A declined signature can be asked for again, and a busy endpoint can be
    /// retried later. A reverted simulation will revert again.
    pub fn is_resubmittable(&self) -> bool {
        match &self.error {
            BridgeError::SigningRejected(_) | BridgeError::SimulationError(_) => true,
            BridgeError::SubmissionFailed { status, .. } => status == "TRY_AGAIN_LATER",
            _ => false,
        }
    }
}
