use anyhow::{Context, Result};
use serde::Deserialize;
use soroban_identity_core::{BridgeConfig, Network};
use std::fs;
use std::path::{Path, PathBuf};

/// Values read from `~/.soroban-identity.toml`
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub contract_id: Option<String>,
    pub source: Option<String>,
    pub signer_url: Option<String>,
}

/// Command-line flags, already merged with their environment variables by clap
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub network_passphrase: Option<String>,
    pub contract_id: Option<String>,
    pub source: Option<String>,
    pub signer_url: Option<String>,
    pub base_fee: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bridge: BridgeConfig,
    pub source: Option<String>,
    pub signer_url: Option<String>,
}

impl Settings {
    pub fn require_source(&self) -> Result<&str> {
        self.source
            .as_deref()
            .context("No source account configured. Pass --source, set STELLAR_SOURCE_ACCOUNT or add `source` to ~/.soroban-identity.toml")
    }
}

pub fn resolve(overrides: Overrides) -> Result<Settings> {
    let file = match config_file_path() {
        Some(path) if path.exists() => load_config_file(&path)?,
        _ => ConfigFile::default(),
    };
    resolve_with(overrides, file)
}

fn resolve_with(overrides: Overrides, file: ConfigFile) -> Result<Settings> {
    // 1. flag / env  2. config file  3. default
    let network = match overrides.network.or(file.network) {
        Some(name) => name.parse::<Network>()?,
        None => Network::Testnet,
    };

    let mut bridge = BridgeConfig::for_network(network);
    if let Some(url) = overrides.rpc_url.or(file.rpc_url) {
        bridge.rpc_endpoint = url;
    }
    if let Some(passphrase) = overrides.network_passphrase {
        bridge.network_passphrase = passphrase;
    }
    if let Some(contract_id) = overrides.contract_id.or(file.contract_id) {
        bridge.contract_id = contract_id;
    }
    if let Some(fee) = overrides.base_fee {
        bridge.base_fee = fee;
    }
    if let Some(timeout) = overrides.timeout_secs {
        bridge.timeout_secs = timeout;
    }
    bridge.validate()?;

    Ok(Settings {
        bridge,
        source: overrides.source.or(file.source),
        signer_url: overrides.signer_url.or(file.signer_url),
    })
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file at {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config file at {:?}", path))
}

fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".soroban-identity.toml");
        p
    })
}
