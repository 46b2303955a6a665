use async_trait::async_trait;
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};

use crate::jito::{EncodedBundle, RelayError};
use crate::submit::types::{BlockhashRef, ConfirmationStatus};

/// One `sendBundle` POST against one relay endpoint.
#[async_trait]
pub trait RelayTransport: Send + Sync + 'static {
    /// Returns the relay-assigned bundle id when the response carries one.
    async fn send_bundle(
        &self,
        url: &str,
        bundle: &EncodedBundle,
    ) -> Result<Option<String>, RelayError>;
}

/// Read-only view of the ledger used around a submission.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> anyhow::Result<BlockhashRef>;

    /// Resolves once the signature reaches `commitment` or its blockhash expires.
    async fn confirm_signature(
        &self,
        signature: &Signature,
        blockhash: &BlockhashRef,
        commitment: CommitmentConfig,
    ) -> anyhow::Result<ConfirmationStatus>;
}
