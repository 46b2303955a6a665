//! Jito bundle fan-out.
//!
//! One signed bundle is encoded once and raced across every configured block
//! engine. Each endpoint runs its own retry sequence in a spawned task; the
//! caller gets back the bundle signature as soon as the winning endpoint is
//! known, followed by a short best-effort confirmation.

use std::{sync::Arc, time::Duration};

use futures::{
    future::join_all,
    stream::{FuturesUnordered, StreamExt},
};
use log::{debug, error, info, warn};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tokio::{
    task::{JoinError, JoinHandle},
    time::{timeout, Instant},
};

use crate::jito::{
    bundle_explorer_url, encode_bundle, EncodedBundle, RelayError, TxEncoder, WireEncoding,
    MAX_BUNDLE_TRANSACTIONS,
};
use crate::submit::iface::{LedgerClient, RelayTransport};
use crate::submit::retry::{send_with_retry, RetryPolicy};
use crate::submit::types::{
    BlockhashRef, BundleReceipt, ConfirmationStatus, EndpointReport, FanoutMode, RejectReason,
    SubmitError, SubmitOutcome,
};

/// Upper bound on the post-submission confirmation wait.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

enum Decision {
    Winner {
        winner: EndpointReport,
        reports: Vec<EndpointReport>,
    },
    Exhausted(Vec<EndpointReport>),
}

pub struct JitoBundle {
    endpoints: Vec<String>,
    relay: Arc<dyn RelayTransport>,
    ledger: Arc<dyn LedgerClient>,
    encoder: Arc<dyn TxEncoder>,
    policy: RetryPolicy,
    confirm_timeout: Duration,
    mode: FanoutMode,
}

impl JitoBundle {
    pub fn new(
        endpoints: Vec<String>,
        relay: Arc<dyn RelayTransport>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        info!("🚀 [JITO] Bundle submitter initialized with {} endpoint(s)", endpoints.len());
        Self {
            endpoints,
            relay,
            ledger,
            encoder: Arc::new(WireEncoding::Base58),
            policy: RetryPolicy::default(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            mode: FanoutMode::AwaitAll,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn TxEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_confirm_timeout(mut self, confirm_timeout: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self
    }

    pub fn with_mode(mut self, mode: FanoutMode) -> Self {
        self.mode = mode;
        self
    }

    /// Submit a pre-signed bundle to every endpoint.
    ///
    /// Relay failures are reported through [`SubmitOutcome::Rejected`];
    /// `Err` is reserved for malformed bundles and blockhash fetch failures.
    /// `payer` only shows up in logs.
    pub async fn submit(
        &self,
        transactions: &[VersionedTransaction],
        payer: &Pubkey,
        commitment: CommitmentLevel,
        blockhash: Option<BlockhashRef>,
    ) -> Result<SubmitOutcome, SubmitError> {
        validate_bundle(transactions)?;
        let signature = transactions[0].signatures[0];

        if self.endpoints.is_empty() {
            warn!("⚠️ [JITO] No relay endpoints configured, bundle {} not sent", signature);
            return Ok(SubmitOutcome::Rejected {
                reason: RejectReason::NoEndpoints,
                reports: Vec::new(),
            });
        }

        let commitment = CommitmentConfig { commitment };

        // A caller-supplied blockhash saves a round trip inside its short validity window.
        let blockhash = match blockhash {
            Some(blockhash) => blockhash,
            None => self
                .ledger
                .latest_blockhash(commitment)
                .await
                .map_err(SubmitError::Blockhash)?,
        };

        let bundle = Arc::new(encode_bundle(self.encoder.as_ref(), transactions)?);

        info!(
            "📦 [JITO] Sending bundle {} ({} tx, payer {}) to {} endpoints",
            signature,
            bundle.len(),
            payer,
            self.endpoints.len()
        );
        let start_time = Instant::now();

        let handles = self.spawn_endpoints(&bundle);
        let decision = match self.mode {
            FanoutMode::AwaitAll => self.await_all(handles).await,
            FanoutMode::FirstSuccess => self.first_success(handles).await,
        };

        match decision {
            Decision::Winner { winner, reports } => {
                info!(
                    "✅ [JITO] Bundle sent successfully (endpoint {}: {}) in {}ms",
                    winner.index + 1,
                    winner.url,
                    start_time.elapsed().as_millis()
                );
                if let Some(bundle_id) = winner.bundle_id() {
                    info!("   Bundle ID: {}", bundle_id);
                    info!("   Check: {}", bundle_explorer_url(bundle_id));
                }
                info!("   Transaction signature: {}", signature);

                let confirmation = self.confirm(&signature, &blockhash, commitment).await;

                Ok(SubmitOutcome::Accepted(BundleReceipt {
                    signature,
                    bundle_id: winner.bundle_id().map(str::to_string),
                    endpoint: winner.url,
                    endpoint_index: winner.index,
                    confirmation,
                    reports,
                }))
            }
            Decision::Exhausted(reports) => {
                let reason = RejectReason::classify(&reports);
                error!(
                    "❌ [JITO] No successful responses from any endpoint after retries ({})",
                    reason
                );
                Ok(SubmitOutcome::Rejected { reason, reports })
            }
        }
    }

    /// Same as [`JitoBundle::submit`] but folds every failure into `None`.
    pub async fn execute(
        &self,
        transactions: &[VersionedTransaction],
        payer: &Pubkey,
        commitment: CommitmentLevel,
        blockhash: Option<BlockhashRef>,
    ) -> Option<Signature> {
        match self.submit(transactions, payer, commitment, blockhash).await {
            Ok(outcome) => outcome.signature(),
            Err(err) => {
                error!("❌ [JITO] Error during bundle execution: {}", err);
                None
            }
        }
    }

    fn spawn_endpoints(&self, bundle: &Arc<EncodedBundle>) -> Vec<JoinHandle<EndpointReport>> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let relay = Arc::clone(&self.relay);
                let bundle = Arc::clone(bundle);
                let policy = self.policy.clone();
                let url = url.clone();
                tokio::spawn(async move {
                    let run = send_with_retry(relay.as_ref(), &url, &bundle, &policy).await;
                    EndpointReport {
                        index,
                        url,
                        attempts: run.attempts,
                        result: run.result,
                    }
                })
            })
            .collect()
    }

    fn join_report(&self, index: usize, joined: Result<EndpointReport, JoinError>) -> EndpointReport {
        joined.unwrap_or_else(|err| EndpointReport {
            index,
            url: self.endpoints[index].clone(),
            attempts: 0,
            result: Err(RelayError::Transport(format!("endpoint task aborted: {err}"))),
        })
    }

    /// Waits for every endpoint, then picks the first success in configured order.
    async fn await_all(&self, handles: Vec<JoinHandle<EndpointReport>>) -> Decision {
        let reports: Vec<EndpointReport> = join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| self.join_report(index, joined))
            .collect();

        let accepted = reports.iter().filter(|r| r.is_success()).count();
        match reports.iter().find(|r| r.is_success()).cloned() {
            Some(winner) => {
                if accepted > 1 {
                    info!("   ✅ Bundle also accepted by {} other endpoint(s)", accepted - 1);
                }
                Decision::Winner { winner, reports }
            }
            None => Decision::Exhausted(reports),
        }
    }

    /// Returns on the first success in time. Endpoints still retrying are
    /// handed to a detached task that only logs how they ended.
    async fn first_success(&self, handles: Vec<JoinHandle<EndpointReport>>) -> Decision {
        let mut pending: FuturesUnordered<_> = handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| async move { (index, handle.await) })
            .collect();

        let mut reports = Vec::with_capacity(self.endpoints.len());
        while let Some((index, joined)) = pending.next().await {
            let report = self.join_report(index, joined);
            if !report.is_success() {
                reports.push(report);
                continue;
            }

            let winner = report.clone();
            reports.push(report);
            reports.sort_by_key(|r| r.index);

            if !pending.is_empty() {
                let still_running = pending.len();
                tokio::spawn(async move {
                    let mut also_accepted = 0;
                    while let Some((index, joined)) = pending.next().await {
                        match joined {
                            Ok(report) if report.is_success() => also_accepted += 1,
                            Ok(report) => debug!(
                                "[JITO] background endpoint {} finished without success after {} attempt(s)",
                                report.url, report.attempts
                            ),
                            Err(err) => warn!("⚠️ [JITO] background endpoint {} aborted: {}", index + 1, err),
                        }
                    }
                    if also_accepted > 0 {
                        info!(
                            "   ✅ Bundle also accepted by {} other endpoint(s) of {} still running",
                            also_accepted, still_running
                        );
                    }
                });
            }

            return Decision::Winner { winner, reports };
        }

        reports.sort_by_key(|r| r.index);
        Decision::Exhausted(reports)
    }

    /// Best-effort receipt: a timeout or RPC error is reported as `Pending`.
    async fn confirm(
        &self,
        signature: &Signature,
        blockhash: &BlockhashRef,
        commitment: CommitmentConfig,
    ) -> ConfirmationStatus {
        let status = match timeout(
            self.confirm_timeout,
            self.ledger.confirm_signature(signature, blockhash, commitment),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                warn!("⚠️ [CONFIRM] Confirmation check failed for {}: {:#}", signature, err);
                ConfirmationStatus::Pending
            }
            Err(_) => ConfirmationStatus::Pending,
        };

        match &status {
            ConfirmationStatus::Confirmed => info!("✅ [CONFIRM] Transaction confirmed"),
            ConfirmationStatus::Failed(err) => {
                warn!("⚠️ [CONFIRM] Transaction landed with error: {}", err)
            }
            ConfirmationStatus::Expired => {
                warn!("⚠️ [CONFIRM] Blockhash expired before the bundle was seen on chain")
            }
            ConfirmationStatus::Pending => {
                info!("⚠️ [CONFIRM] Confirmation pending - bundle was sent, check status manually")
            }
        }
        status
    }
}

fn validate_bundle(transactions: &[VersionedTransaction]) -> Result<(), SubmitError> {
    if transactions.is_empty() {
        return Err(SubmitError::EmptyBundle);
    }
    if transactions.len() > MAX_BUNDLE_TRANSACTIONS {
        return Err(SubmitError::TooManyTransactions {
            count: transactions.len(),
            max: MAX_BUNDLE_TRANSACTIONS,
        });
    }

    for (index, tx) in transactions.iter().enumerate() {
        let required = tx.message.header().num_required_signatures as usize;
        let unsigned = tx.signatures.is_empty()
            || tx.signatures.len() < required
            || tx.signatures.iter().any(|sig| *sig == Signature::default());
        if unsigned {
            return Err(SubmitError::Unsigned { index });
        }
    }
    Ok(())
}
