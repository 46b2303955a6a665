//! Quick check of Jito bundle landing status
//!
//! Usage: cargo run --bin check_bundle_status -- <BUNDLE_ID>...

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jito_fanout::{
    config::settings::{Settings, DEFAULT_SETTINGS_PATH},
    jito::{bundle_explorer_url, JitoRelay},
};

#[derive(Parser, Debug)]
#[command(about = "Look up bundle ids returned by sendBundle")]
struct Args {
    #[arg(required = true)]
    bundle_ids: Vec<String>,

    /// Relay to ask (defaults to the first configured endpoint)
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = Settings::load_from_file(&args.settings)?;
    let endpoint = match args.endpoint {
        Some(endpoint) => endpoint,
        None => settings
            .relay_endpoints
            .first()
            .cloned()
            .context("no relay endpoints configured")?,
    };

    println!("🔍 Checking {} bundle(s) via {}", args.bundle_ids.len(), endpoint);

    let relay = JitoRelay::new(settings.request_timeout)?;
    let statuses = relay.get_bundle_statuses(&endpoint, &args.bundle_ids).await?;

    for (bundle_id, status) in args.bundle_ids.iter().zip(statuses) {
        match status {
            None => println!("❌ {}: not found or not landed", bundle_id),
            Some(info) => {
                println!("✅ {}:", info.bundle_id);
                println!("   Slot: {}", info.slot);
                println!(
                    "   Confirmation Status: {}",
                    info.confirmation_status.as_deref().unwrap_or("N/A")
                );
                println!("   Transactions: {}", info.transactions.join(", "));
                println!("   Error: {}", info.err);
                println!("   Check: {}", bundle_explorer_url(&info.bundle_id));
            }
        }
    }

    Ok(())
}
