mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "soroban-identity")]
#[command(about = "Register, verify and look up identities in the Soroban identity registry", long_about = None)]
#[command(version)]
struct Cli {
    /// Stellar network (mainnet, testnet, futurenet)
    #[arg(long, global = true, env = "STELLAR_NETWORK")]
    network: Option<String>,

    /// Soroban RPC endpoint
    #[arg(long, global = true, env = "STELLAR_RPC_URL")]
    rpc_url: Option<String>,

    /// Override the network passphrase
    #[arg(long, global = true, env = "STELLAR_NETWORK_PASSPHRASE", hide = true)]
    network_passphrase: Option<String>,

    /// Identity registry contract id
    #[arg(long, global = true, env = "IDENTITY_CONTRACT_ID")]
    contract_id: Option<String>,

    /// Account that invokes the contract (G...)
    #[arg(long, global = true, env = "STELLAR_SOURCE_ACCOUNT")]
    source: Option<String>,

    /// Wallet signing endpoint; without one every write is declined
    #[arg(long, global = true, env = "SIGNER_URL")]
    signer_url: Option<String>,

    /// Base inclusion fee in stroops
    #[arg(long, global = true, env = "TX_BASE_FEE", hide = true)]
    base_fee: Option<u32>,

    /// Transaction time-to-live in seconds
    #[arg(long, global = true, env = "TX_TIMEOUT_SECS", hide = true)]
    timeout: Option<u64>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an identity for the source account
    Register {
        #[arg(long)]
        name: String,

        /// Country code, e.g. MX
        #[arg(long)]
        country: String,

        /// Document type, e.g. passport or selfie
        #[arg(long)]
        doc_type: String,

        /// Precomputed document hash
        #[arg(long, conflicts_with = "doc_file", required_unless_present = "doc_file")]
        doc_hash: Option<String>,

        /// Document to fingerprint with SHA-256
        #[arg(long)]
        doc_file: Option<PathBuf>,
    },

    /// Mark an address's identity as verified
    Verify {
        /// Address whose identity is verified
        address: String,
    },

    /// Show the identity registered for an address
    Get {
        /// Defaults to the source account
        address: Option<String>,
    },

    /// Show RPC health and the latest ledger
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soroban_identity=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let as_json = cli.json;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_failure(&err, as_json);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::resolve(config::Overrides {
        network: cli.network,
        rpc_url: cli.rpc_url,
        network_passphrase: cli.network_passphrase,
        contract_id: cli.contract_id,
        source: cli.source,
        signer_url: cli.signer_url,
        base_fee: cli.base_fee,
        timeout_secs: cli.timeout,
    })?;

    match cli.command {
        Commands::Register {
            name,
            country,
            doc_type,
            doc_hash,
            doc_file,
        } => {
            commands::register(
                &settings,
                &name,
                &country,
                &doc_type,
                doc_hash.as_deref(),
                doc_file.as_deref(),
                cli.json,
            )
            .await?;
        }
        Commands::Verify { address } => {
            commands::verify(&settings, &address, cli.json).await?;
        }
        Commands::Get { address } => {
            commands::get(&settings, address.as_deref(), cli.json).await?;
        }
        Commands::Status => {
            commands::status(&settings, cli.json).await?;
        }
    }
    Ok(())
}
