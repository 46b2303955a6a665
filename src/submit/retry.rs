//! Per-endpoint retry sequence with capped exponential backoff.
//!
//! Only HTTP 429 is retried. Every other failure ends the sequence for that
//! endpoint on the spot, and no endpoint's sequence looks at another's.

use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use tokio::time::{sleep, timeout};

use crate::jito::{EncodedBundle, RelayError};
use crate::submit::iface::RelayTransport;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter is drawn from `[0, max_jitter)`.
    pub max_jitter: Duration,
    /// Bound on a single `sendBundle` call.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(20_000),
            max_jitter: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^attempt, max_delay)`
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn backoff_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..jitter_ms))
        };
        self.backoff_ceiling(attempt) + jitter
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptState {
    /// Zero-based attempt about to be sent.
    Attempting(u32),
    Succeeded(Option<String>),
    Failed(RelayError),
}

/// Terminal result of one endpoint's sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryRun {
    pub attempts: u32,
    pub result: Result<Option<String>, RelayError>,
}

pub async fn send_with_retry(
    relay: &dyn RelayTransport,
    url: &str,
    bundle: &EncodedBundle,
    policy: &RetryPolicy,
) -> RetryRun {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    let mut state = AttemptState::Attempting(0);

    loop {
        state = match state {
            AttemptState::Attempting(n) => {
                attempts = n + 1;
                debug!("🔁 [RETRY] {} attempt {}/{}", url, attempts, max_attempts);

                let sent = match timeout(policy.request_timeout, relay.send_bundle(url, bundle)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(RelayError::Timeout(policy.request_timeout)),
                };

                match sent {
                    Ok(bundle_id) => AttemptState::Succeeded(bundle_id),
                    Err(err) if err.is_rate_limited() && attempts < max_attempts => {
                        let delay = {
                            let mut rng = rand::thread_rng();
                            policy.backoff_delay(n, &mut rng)
                        };
                        warn!(
                            "⏳ [RETRY] {} rate limited, backing off {}ms ({}/{})",
                            url,
                            delay.as_millis(),
                            attempts,
                            max_attempts
                        );
                        sleep(delay).await;
                        AttemptState::Attempting(n + 1)
                    }
                    Err(err) => AttemptState::Failed(err),
                }
            }
            AttemptState::Succeeded(bundle_id) => {
                return RetryRun {
                    attempts,
                    result: Ok(bundle_id),
                }
            }
            AttemptState::Failed(err) => {
                warn!("❌ [RETRY] {} gave up after {} attempt(s): {}", url, attempts, err);
                return RetryRun {
                    attempts,
                    result: Err(err),
                };
            }
        };
    }
}
