//! Block-engine JSON-RPC transport (`sendBundle`, `getBundleStatuses`).

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::jito::encoding::{EncodedBundle, WireEncoding};
use crate::submit::iface::RelayTransport;

/// Longest slice of an error body kept in a `RelayError`.
const MAX_ERROR_BODY: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("relay returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("relay rejected bundle (code {code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed relay response: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// HTTP 429 is the only retryable relay failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RelayError::RateLimited)
    }
}

fn categorize_reqwest_error(err: &reqwest::Error) -> RelayError {
    if err.is_timeout() {
        return RelayError::Timeout(Duration::ZERO);
    }

    if let Some(status) = err.status() {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return RelayError::RateLimited;
        }
        return RelayError::Http {
            status: status.as_u16(),
            body: err.to_string(),
        };
    }

    RelayError::Transport(err.to_string())
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        categorize_reqwest_error(&err)
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

/// Landing status reported by `getBundleStatuses`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BundleStatus {
    pub bundle_id: String,
    #[serde(default)]
    pub transactions: Vec<String>,
    pub slot: u64,
    pub confirmation_status: Option<String>,
    #[serde(default)]
    pub err: Value,
}

#[derive(Debug, Deserialize)]
struct StatusesEnvelope {
    value: Vec<Option<BundleStatus>>,
}

/// reqwest-backed relay client; one instance is shared by every endpoint task.
#[derive(Clone, Debug)]
pub struct JitoRelay {
    client: Client,
    request_timeout: Duration,
}

impl JitoRelay {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("building relay http client")?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// `sendBundle` request body. Base58 keeps the bare `[[txs]]` params
    /// shape; any other encoding is named in a second param.
    pub fn send_bundle_body(bundle: &EncodedBundle) -> Value {
        match bundle.encoding {
            WireEncoding::Base58 => json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "sendBundle",
                "params": [bundle.transactions],
            }),
            encoding => json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "sendBundle",
                "params": [bundle.transactions, { "encoding": encoding.as_str() }],
            }),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, RelayError> {
        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RelayError::RateLimited);
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RelayError::Http {
                status: status.as_u16(),
                body: truncate_body(text),
            });
        }

        let text = res.text().await.map_err(|err| self.classify(err))?;
        // A 2xx body that is not JSON still counts as delivered.
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    fn classify(&self, err: reqwest::Error) -> RelayError {
        match categorize_reqwest_error(&err) {
            RelayError::Timeout(_) => RelayError::Timeout(self.request_timeout),
            other => other,
        }
    }

    /// Look up landing status for bundle ids previously returned by `sendBundle`.
    pub async fn get_bundle_statuses(
        &self,
        url: &str,
        bundle_ids: &[String],
    ) -> Result<Vec<Option<BundleStatus>>, RelayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBundleStatuses",
            "params": [bundle_ids],
        });

        let resp = self.post_json(url, &body).await?;
        if let Some(err) = rpc_error(&resp) {
            return Err(err);
        }

        let result = resp
            .get("result")
            .cloned()
            .ok_or_else(|| RelayError::Decode(format!("missing 'result' in {resp}")))?;
        let envelope: StatusesEnvelope =
            serde_json::from_value(result).map_err(|e| RelayError::Decode(e.to_string()))?;
        Ok(envelope.value)
    }
}

fn rpc_error(resp: &Value) -> Option<RelayError> {
    let err = resp.get("error").filter(|e| !e.is_null())?;
    Some(RelayError::Rpc {
        code: err["code"].as_i64().unwrap_or_default(),
        message: err["message"].as_str().unwrap_or("unknown error").to_string(),
    })
}

#[async_trait]
impl RelayTransport for JitoRelay {
    async fn send_bundle(
        &self,
        url: &str,
        bundle: &EncodedBundle,
    ) -> Result<Option<String>, RelayError> {
        let start_time = Instant::now();
        let body = Self::send_bundle_body(bundle);

        let resp = self.post_json(url, &body).await?;
        // Delivery is decided by HTTP status alone; an error body on a 2xx is only logged.
        if let Some(err) = rpc_error(&resp) {
            warn!("⚠️ [RELAY] {} answered 2xx with an error body: {}", url, err);
            return Ok(None);
        }

        let bundle_id = resp["result"].as_str().map(str::to_string);
        debug!(
            "📤 [RELAY] {} accepted bundle in {}ms (id: {:?})",
            url,
            start_time.elapsed().as_millis(),
            bundle_id
        );
        Ok(bundle_id)
    }
}
