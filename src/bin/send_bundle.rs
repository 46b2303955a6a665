//! Submit a file of pre-signed transactions as one Jito bundle
//!
//! Usage: cargo run --bin send_bundle -- --bundle bundle.txt

use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use jito_fanout::{
    config::settings::{Settings, DEFAULT_SETTINGS_PATH},
    jito::decode_transaction,
    submit::{self, FanoutMode, SubmitOutcome},
};
use solana_sdk::commitment_config::CommitmentLevel;

#[derive(Parser, Debug)]
#[command(about = "Fan a pre-signed bundle out to every configured block engine")]
struct Args {
    /// One wire-encoded signed transaction per line, in bundle order
    #[arg(long)]
    bundle: PathBuf,

    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// processed | confirmed | finalized (overrides settings)
    #[arg(long)]
    commitment: Option<String>,

    /// Return on the first accepting endpoint instead of waiting for all
    #[arg(long)]
    first_success: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = Settings::load_from_file(&args.settings)?;
    if let Some(commitment) = &args.commitment {
        settings.commitment = CommitmentLevel::from_str(commitment).context("invalid --commitment")?;
    }
    if args.first_success {
        settings.fanout = FanoutMode::FirstSuccess;
    }
    debug!(
        "⚙️ Effective settings: {}",
        serde_json::to_string(&settings.to_serializable())?
    );

    let raw = fs::read_to_string(&args.bundle)
        .with_context(|| format!("reading bundle file {:?}", args.bundle))?;
    let transactions = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(i, line)| {
            decode_transaction(line, settings.encoding)
                .with_context(|| format!("transaction #{} in {:?}", i + 1, args.bundle))
        })
        .collect::<Result<Vec<_>>>()?;

    // Fee payer of the first transaction, for log context only.
    let payer = transactions
        .first()
        .and_then(|tx| tx.message.static_account_keys().first().copied())
        .context("bundle file contains no transactions")?;

    println!(
        "📦 Sending {} transaction(s) from {} to {} endpoint(s)",
        transactions.len(),
        payer,
        settings.relay_endpoints.len()
    );

    let submitter = submit::default(&settings)?;
    let outcome = submitter
        .submit(&transactions, &payer, settings.commitment, None)
        .await?;

    let rejected = match &outcome {
        SubmitOutcome::Accepted(receipt) => {
            println!("✅ Bundle accepted by {}", receipt.endpoint);
            if let Some(bundle_id) = &receipt.bundle_id {
                println!("   Bundle ID: {}", bundle_id);
            }
            println!("   Signature: {}", receipt.signature);
            println!("   Confirmation: {:?}", receipt.confirmation);
            false
        }
        SubmitOutcome::Rejected { reason, .. } => {
            println!("❌ Bundle rejected: {}", reason);
            true
        }
    };

    for report in outcome.reports() {
        match &report.result {
            Ok(_) => println!("   {} ({} attempt(s)): accepted", report.url, report.attempts),
            Err(err) => println!("   {} ({} attempt(s)): {}", report.url, report.attempts, err),
        }
    }

    if rejected {
        std::process::exit(1);
    }

    Ok(())
}
