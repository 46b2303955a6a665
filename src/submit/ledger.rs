//! `LedgerClient` over the process-wide non-blocking `RpcClient`.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use tokio::time::sleep;

use crate::submit::iface::LedgerClient;
use crate::submit::types::{BlockhashRef, ConfirmationStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);

pub struct RpcLedger {
    rpc: Arc<RpcClient>,
    poll_interval: Duration,
}

impl RpcLedger {
    pub fn new(rpc: Arc<RpcClient>, poll_interval: Duration) -> Self {
        Self { rpc, poll_interval }
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<BlockhashRef> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(commitment)
            .await
            .context("getLatestBlockhash")?;
        Ok(BlockhashRef {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn confirm_signature(
        &self,
        signature: &Signature,
        blockhash: &BlockhashRef,
        commitment: CommitmentConfig,
    ) -> Result<ConfirmationStatus> {
        loop {
            let status = self
                .rpc
                .get_signature_status_with_commitment(signature, commitment)
                .await
                .context("getSignatureStatuses")?;

            if let Some(result) = status {
                return Ok(match result {
                    Ok(()) => ConfirmationStatus::Confirmed,
                    Err(err) => ConfirmationStatus::Failed(err.to_string()),
                });
            }

            let height = self
                .rpc
                .get_block_height_with_commitment(commitment)
                .await
                .context("getBlockHeight")?;
            if height > blockhash.last_valid_block_height {
                debug!(
                    "⌛ [CONFIRM] {} blockhash expired at height {} (last valid {})",
                    signature, height, blockhash.last_valid_block_height
                );
                return Ok(ConfirmationStatus::Expired);
            }

            sleep(self.poll_interval).await;
        }
    }
}
