//! Submission inputs, outcomes and errors.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, signature::Signature};
use thiserror::Error;

use crate::jito::RelayError;

/// Blockhash plus the last block height at which it is still valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockhashRef {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// How the coordinator decides the winning endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// Wait for every endpoint, then take the first success in configured order.
    #[default]
    AwaitAll,
    /// Return on the first success in time; the rest keep running detached.
    FirstSuccess,
}

impl FromStr for FanoutMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "await_all" => Ok(FanoutMode::AwaitAll),
            "first_success" => Ok(FanoutMode::FirstSuccess),
            other => Err(anyhow!("unknown fanout mode `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    /// Landed but the transaction itself failed.
    Failed(String),
    /// Blockhash expired before a status showed up.
    Expired,
    /// No answer within the confirmation window; the bundle may still land.
    Pending,
}

/// Terminal state of one endpoint's retry sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointReport {
    pub index: usize,
    pub url: String,
    pub attempts: u32,
    pub result: Result<Option<String>, RelayError>,
}

impl EndpointReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.result.as_ref().ok().and_then(|id| id.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    NoEndpoints,
    /// Every endpoint kept answering 429 until its attempts ran out.
    RateLimitExhausted,
    /// Every endpoint failed with a non-retryable error.
    HardFailure,
    Mixed { rate_limited: usize, hard_failed: usize },
}

impl RejectReason {
    pub fn classify(reports: &[EndpointReport]) -> Self {
        let mut rate_limited = 0;
        let mut hard_failed = 0;
        for report in reports {
            match &report.result {
                Err(err) if err.is_rate_limited() => rate_limited += 1,
                Err(_) => hard_failed += 1,
                Ok(_) => {}
            }
        }

        match (rate_limited, hard_failed) {
            (0, 0) => RejectReason::NoEndpoints,
            (_, 0) => RejectReason::RateLimitExhausted,
            (0, _) => RejectReason::HardFailure,
            (rate_limited, hard_failed) => RejectReason::Mixed {
                rate_limited,
                hard_failed,
            },
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoEndpoints => write!(f, "no relay endpoints configured"),
            RejectReason::RateLimitExhausted => {
                write!(f, "every endpoint stayed rate limited after retries")
            }
            RejectReason::HardFailure => write!(f, "every endpoint rejected the bundle"),
            RejectReason::Mixed {
                rate_limited,
                hard_failed,
            } => write!(
                f,
                "{rate_limited} endpoint(s) rate limited, {hard_failed} endpoint(s) failed"
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleReceipt {
    /// First signature of the first transaction.
    pub signature: Signature,
    pub bundle_id: Option<String>,
    pub endpoint: String,
    pub endpoint_index: usize,
    pub confirmation: ConfirmationStatus,
    /// Reports known when the outcome was decided. In first-success mode
    /// this only covers endpoints that had finished by then.
    pub reports: Vec<EndpointReport>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(BundleReceipt),
    Rejected {
        reason: RejectReason,
        reports: Vec<EndpointReport>,
    },
}

impl SubmitOutcome {
    pub fn signature(&self) -> Option<Signature> {
        match self {
            SubmitOutcome::Accepted(receipt) => Some(receipt.signature),
            SubmitOutcome::Rejected { .. } => None,
        }
    }

    pub fn reports(&self) -> &[EndpointReport] {
        match self {
            SubmitOutcome::Accepted(receipt) => &receipt.reports,
            SubmitOutcome::Rejected { reports, .. } => reports,
        }
    }
}

/// Malformed input or internal faults; relay failures never end up here.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("bundle contains no transactions")]
    EmptyBundle,
    #[error("bundle has {count} transactions, relays accept at most {max}")]
    TooManyTransactions { count: usize, max: usize },
    #[error("transaction {index} is not fully signed")]
    Unsigned { index: usize },
    #[error("failed to serialize transaction {index}: {source}")]
    Encode {
        index: usize,
        source: bincode::Error,
    },
    #[error("failed to fetch latest blockhash: {0:#}")]
    Blockhash(anyhow::Error),
}
