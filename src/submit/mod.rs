pub mod iface;
pub mod jito_bundle;
pub mod ledger;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use anyhow::Result;

use crate::config::settings::Settings;
use crate::jito::JitoRelay;

pub use iface::{LedgerClient, RelayTransport};
pub use jito_bundle::JitoBundle;
pub use ledger::RpcLedger;
pub use retry::{send_with_retry, RetryPolicy, RetryRun};
pub use types::{
    BlockhashRef, BundleReceipt, ConfirmationStatus, EndpointReport, FanoutMode, RejectReason,
    SubmitError, SubmitOutcome,
};

/// Builds the bundle submitter described by `settings`.
/// The ledger side reuses the settings' shared RPC client.
pub fn default(settings: &Settings) -> Result<JitoBundle> {
    let relay = JitoRelay::new(settings.request_timeout)?;
    let ledger = RpcLedger::new(Arc::clone(&settings.rpc_client), settings.confirm_poll_interval);

    Ok(JitoBundle::new(settings.relay_endpoints.clone(), Arc::new(relay), Arc::new(ledger))
        .with_policy(settings.retry_policy())
        .with_encoder(Arc::new(settings.encoding))
        .with_confirm_timeout(settings.confirm_timeout)
        .with_mode(settings.fanout))
}
