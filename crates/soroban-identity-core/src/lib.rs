//! soroban-identity-core — client bridge to the identity registry contract
//!
//! Builds, simulates, hands off for signing and submits contract invocations,
//! and decodes the contract's typed return values into plain literals.

pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod identity;
pub mod registry;
pub mod signing;
pub mod simulation;
pub mod submission;
pub mod types;

pub use builder::{ContractArg, TransactionBuilder, UnsignedTransaction};
pub use client::{LedgerRpc, RpcError, StellarRpcClient};
pub use codec::{decode, decode_base64, decode_xdr, encode, CodecError};
pub use config::{BridgeConfig, ConfigError, Network};
pub use error::{BridgeError, PipelineError, Stage};
pub use identity::{IdentityLookup, IdentityRecord, IdentityRegistration};
pub use registry::IdentityRegistryClient;
pub use signing::{HttpSigningAgent, NoSigningAgent, SignedEnvelope, SigningAgent, SigningError};
pub use simulation::{PreparedTransaction, Simulator};
pub use types::*;
