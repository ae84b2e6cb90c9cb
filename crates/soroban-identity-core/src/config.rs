/// Network and transaction configuration
/// Resolves the target Stellar network, RPC endpoint and registry contract

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use stellar_xdr::curr::ScAddress;
use thiserror::Error;
use tracing::info;

/// Identity registry contract deployed on testnet
pub const DEFAULT_CONTRACT_ID: &str = "CC4UISVTMAALCI4KMEDS4L6WRKWKYKJDFU543PRYLB65ZUA7MTKLK76T";

/// Minimum inclusion fee accepted by the network, in stroops
pub const BASE_FEE: u32 = 100;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Futurenet,
}

impl Network {
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Mainnet => "Public Global Stellar Network ; September 2015",
            Network::Testnet => "Test SDF Network ; September 2015",
            Network::Futurenet => "Test SDF Future Network ; October 2022",
        }
    }

    pub fn default_rpc_endpoint(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://mainnet.stellar.validationcloud.io/v1/soroban/rpc",
            Network::Testnet => "https://soroban-testnet.stellar.org",
            Network::Futurenet => "https://rpc-futurenet.stellar.org",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Futurenet => write!(f, "futurenet"),
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "futurenet" => Ok(Network::Futurenet),
            _ => Err(ConfigError::InvalidNetwork(s.to_string())),
        }
    }
}

/// Everything a pipeline needs to know about where and how to transact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub network: Network,
    pub rpc_endpoint: String,
    pub network_passphrase: String,
    pub contract_id: String,
    pub base_fee: u32,
    /// Transaction time-to-live
    pub timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl BridgeConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            rpc_endpoint: network.default_rpc_endpoint().to_string(),
            network_passphrase: network.passphrase().to_string(),
            contract_id: DEFAULT_CONTRACT_ID.to_string(),
            base_fee: BASE_FEE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn testnet() -> Self {
        Self::for_network(Network::Testnet)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let network = env::var("STELLAR_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse::<Network>()?;

        let mut config = Self::for_network(network);

        if let Ok(endpoint) = env::var("STELLAR_RPC_URL") {
            config.rpc_endpoint = endpoint;
        }
        if let Ok(passphrase) = env::var("STELLAR_NETWORK_PASSPHRASE") {
            config.network_passphrase = passphrase;
        }
        if let Ok(contract_id) = env::var("IDENTITY_CONTRACT_ID") {
            config.contract_id = contract_id;
        }
        if let Some(fee) = parse_env::<u32>("TX_BASE_FEE")? {
            config.base_fee = fee;
        }
        if let Some(timeout) = parse_env::<u64>("TX_TIMEOUT_SECS")? {
            config.timeout_secs = timeout;
        }
        if let Some(timeout) = parse_env::<u64>("RPC_TIMEOUT_SECS")? {
            config.request_timeout_secs = timeout;
        }

        config.validate()?;

        info!(
            network = %config.network,
            endpoint = %config.rpc_endpoint,
            contract = %config.contract_id,
            "Bridge configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_fee < BASE_FEE {
            return Err(ConfigError::InvalidConfig(format!(
                "Base fee must be at least {} stroops",
                BASE_FEE
            )));
        }

        if self.timeout_secs < 1 || self.timeout_secs > 300 {
            return Err(ConfigError::InvalidConfig(
                "Transaction timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        match ScAddress::from_str(&self.contract_id) {
            Ok(ScAddress::Contract(_)) => Ok(()),
            _ => Err(ConfigError::InvalidConfig(format!(
                "Invalid contract id: {}",
                self.contract_id
            ))),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::testnet()
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid {}: {} ({})", name, raw, e))),
        Err(_) => Ok(None),
    }
}
