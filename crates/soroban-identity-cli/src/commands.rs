use crate::config::Settings;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use soroban_identity_core::{
    HttpSigningAgent, IdentityLookup, IdentityRegistration, IdentityRegistryClient, NoSigningAgent, PipelineError,
    SigningAgent, StellarRpcClient, SubmissionReceipt,
};
use std::fs;
use std::path::Path;

type Client = IdentityRegistryClient<StellarRpcClient, Box<dyn SigningAgent>>;

fn client(settings: &Settings) -> Result<Client> {
    let source = settings.require_source()?;
    let rpc = StellarRpcClient::from_config(&settings.bridge);
    let signer: Box<dyn SigningAgent> = match &settings.signer_url {
        Some(url) => Box::new(HttpSigningAgent::new(url)),
        None => Box::new(NoSigningAgent),
    };

    Ok(IdentityRegistryClient::new(&settings.bridge, rpc, signer, source)?)
}

pub async fn register(
    settings: &Settings,
    name: &str,
    country: &str,
    doc_type: &str,
    doc_hash: Option<&str>,
    doc_file: Option<&Path>,
    as_json: bool,
) -> Result<()> {
    let registration = match (doc_hash, doc_file) {
        (Some(hash), _) => IdentityRegistration::new(name, country, doc_type, hash),
        (None, Some(path)) => {
            let document =
                fs::read(path).with_context(|| format!("Failed to read document at {}", path.display()))?;
            IdentityRegistration::with_document(name, country, doc_type, &document)
        }
        (None, None) => anyhow::bail!("Either --doc-hash or --doc-file is required"),
    };

    let client = client(settings)?;
    if !as_json {
        println!(
            "\n{} {} for {}",
            "Registering identity".bold().cyan(),
            registration.name.bold(),
            client.source_account().bright_black()
        );
    }

    let receipt = client.register_identity(&registration).await?;
    print_receipt(&receipt, as_json)
}

pub async fn verify(settings: &Settings, user: &str, as_json: bool) -> Result<()> {
    let client = client(settings)?;
    if !as_json {
        println!("\n{} {}", "Verifying identity of".bold().cyan(), user.bright_black());
    }

    let receipt = client.verify_identity(user).await?;
    print_receipt(&receipt, as_json)
}

pub async fn get(settings: &Settings, user: Option<&str>, as_json: bool) -> Result<()> {
    let client = client(settings)?;
    let user = user.unwrap_or(client.source_account()).to_string();

    let lookup = client.get_identity(&user).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
        return Ok(());
    }

    println!("\n{}", "Identity:".bold().cyan());
    println!("{}", "=".repeat(60).cyan());
    println!("  Address: {}", user.bright_black());

    match lookup {
        IdentityLookup::NotFound => println!("{}", "No identity registered for this address.".yellow()),
        IdentityLookup::Found(record) => {
            let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
            println!("  Name: {}", field(&record.name).bold());
            println!("  Country: {}", field(&record.country));
            println!("  Document: {} ({})", field(&record.doc_type), field(&record.doc_hash).bright_black());
            println!(
                "  Status: {}",
                if record.verified {
                    "✓ Verified".green()
                } else {
                    "○ Unverified".yellow()
                }
            );
        }
    }
    println!("{}", "=".repeat(60).cyan());

    Ok(())
}

pub async fn status(settings: &Settings, as_json: bool) -> Result<()> {
    let rpc = StellarRpcClient::from_config(&settings.bridge);
    let health = rpc.get_health().await.context("Failed to reach RPC endpoint")?;
    let ledger = rpc.get_latest_ledger().await.context("Failed to fetch latest ledger")?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "network": settings.bridge.network.to_string(),
                "rpcUrl": settings.bridge.rpc_endpoint,
                "contractId": settings.bridge.contract_id,
                "health": health,
                "latestLedger": ledger,
            }))?
        );
        return Ok(());
    }

    println!("\n{}", "RPC Status:".bold().cyan());
    println!("  Network: {}", settings.bridge.network.to_string().bright_blue());
    println!("  Endpoint: {}", settings.bridge.rpc_endpoint);
    println!("  Contract: {}", settings.bridge.contract_id.bright_black());
    println!(
        "  Health: {}",
        if health == "healthy" {
            health.green()
        } else {
            health.yellow()
        }
    );
    println!(
        "  Latest ledger: {} (protocol {})",
        ledger.sequence.to_string().bold(),
        ledger.protocol_version
    );

    Ok(())
}

fn print_receipt(receipt: &SubmissionReceipt, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(receipt)?);
        return Ok(());
    }

    println!("{} Transaction accepted ({})", "✓".green(), receipt.status.to_string().bright_blue());
    println!("  Hash: {}", receipt.hash.bold());
    println!("  Latest ledger: {}", receipt.latest_ledger);
    println!(
        "  {}",
        "Inclusion is not awaited; check the hash on a ledger explorer.".bright_black()
    );

    Ok(())
}

/// Print a failed command, naming the pipeline stage when there is one
pub fn report_failure(err: &anyhow::Error, as_json: bool) {
    let pipeline = err.downcast_ref::<PipelineError>();

    if as_json {
        let body = match pipeline {
            Some(failure) => json!({
                "stage": failure.stage,
                "error": failure.error.to_string(),
                "resubmittable": failure.is_resubmittable(),
            }),
            None => json!({ "error": format!("{:#}", err) }),
        };
        eprintln!("{}", body);
        return;
    }

    match pipeline {
        Some(failure) => {
            eprintln!("{} Failed@{}: {}", "✗".red(), failure.stage, failure.error);
            if failure.is_resubmittable() {
                eprintln!("  {}", "Nothing was recorded on the ledger; the call can be retried.".yellow());
            }
        }
        None => eprintln!("{} {:#}", "✗".red(), err),
    }
}
