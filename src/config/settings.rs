//! Runtime configuration loader and common helpers.

use std::{fmt, fs, path::Path, str::FromStr, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};

use crate::jito::{WireEncoding, DEFAULT_BLOCK_ENGINES};
use crate::submit::{
    jito_bundle::DEFAULT_CONFIRM_TIMEOUT, ledger::DEFAULT_POLL_INTERVAL, FanoutMode, RetryPolicy,
};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// ------------------------------------------------------------------
/// Serializable Settings (everything except the shared client)
/// ------------------------------------------------------------------
#[derive(Debug, Serialize)]
pub struct SerializableSettings {
    pub rpc_url: String,
    pub relay_endpoints: Vec<String>,
    pub commitment: String,
    pub encoding: WireEncoding,
    pub fanout: FanoutMode,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub request_timeout_ms: u64,
    pub confirm_timeout_ms: u64,
    pub confirm_poll_interval_ms: u64,
}

/// ------------------------------------------------------------------
/// Main Settings object
/// ------------------------------------------------------------------
pub struct Settings {
    /* -------- infrastructure ------------------------ */
    pub rpc_url: String,
    pub relay_endpoints: Vec<String>,

    /* -------- submission ---------------------------- */
    pub commitment: CommitmentLevel,
    pub encoding: WireEncoding,
    pub fanout: FanoutMode,

    /* -------- retry tuning -------------------------- */
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
    pub request_timeout: Duration,

    /* -------- confirmation -------------------------- */
    pub confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,

    /* -------- shared objects ------------------------ */
    pub rpc_client: Arc<RpcClient>,
}

fn millis(json: &serde_json::Value, key: &str, default: u64) -> Duration {
    Duration::from_millis(json[key].as_u64().unwrap_or(default))
}

impl Settings {
    /// --------------------------------------------------------------
    /// Read `settings.json` from disk.
    /// --------------------------------------------------------------
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading settings file {:?}", path.as_ref()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("parsing settings file {:?}", path.as_ref()))
    }

    /// --------------------------------------------------------------
    /// Load settings from default config/settings.json file.
    /// --------------------------------------------------------------
    pub fn load() -> Result<Self> {
        Self::load_from_file(DEFAULT_SETTINGS_PATH)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(raw)?;
        let defaults = RetryPolicy::default();

        /* -------- plain strings ---------------------------------- */
        let rpc_url = json["rpc_url"]
            .as_str()
            .unwrap_or(DEFAULT_RPC_URL)
            .to_string();

        let relay_endpoints: Vec<String> = match json.get("relay_endpoints") {
            Some(value) => serde_json::from_value(value.clone())
                .context("`relay_endpoints` must be a list of urls")?,
            None => DEFAULT_BLOCK_ENGINES.iter().map(|s| s.to_string()).collect(),
        };
        if relay_endpoints.is_empty() {
            bail!("`relay_endpoints` is empty, at least one relay url is required");
        }

        /* -------- enums ------------------------------------------ */
        let commitment = CommitmentLevel::from_str(json["commitment"].as_str().unwrap_or("confirmed"))
            .context("invalid `commitment`")?;
        let encoding = json["encoding"]
            .as_str()
            .map(WireEncoding::from_str)
            .transpose()?
            .unwrap_or_default();
        let fanout = json["fanout"]
            .as_str()
            .map(FanoutMode::from_str)
            .transpose()?
            .unwrap_or_default();

        /* -------- numeric parameters ----------------------------- */
        let max_attempts = match json["max_attempts"].as_u64() {
            Some(n) => u32::try_from(n).context("`max_attempts` does not fit in u32")?,
            None => defaults.max_attempts,
        };
        if max_attempts == 0 {
            bail!("`max_attempts` must be at least 1");
        }
        let base_delay = millis(&json, "base_delay_ms", defaults.base_delay.as_millis() as u64);
        let max_delay = millis(&json, "max_delay_ms", defaults.max_delay.as_millis() as u64);
        let max_jitter = millis(&json, "max_jitter_ms", defaults.max_jitter.as_millis() as u64);
        let request_timeout = millis(
            &json,
            "request_timeout_ms",
            defaults.request_timeout.as_millis() as u64,
        );
        let confirm_timeout = millis(
            &json,
            "confirm_timeout_ms",
            DEFAULT_CONFIRM_TIMEOUT.as_millis() as u64,
        );
        let confirm_poll_interval = millis(
            &json,
            "confirm_poll_interval_ms",
            DEFAULT_POLL_INTERVAL.as_millis() as u64,
        );

        /* -------- misc ------------------------------------------- */
        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            rpc_url.clone(),
            CommitmentConfig { commitment },
        ));

        Ok(Self {
            rpc_url,
            relay_endpoints,
            commitment,
            encoding,
            fanout,
            max_attempts,
            base_delay,
            max_delay,
            max_jitter,
            request_timeout,
            confirm_timeout,
            confirm_poll_interval,
            rpc_client,
        })
    }

    /// --------------------------------------------------------------
    /// Helper: retry policy applied to every relay endpoint.
    /// --------------------------------------------------------------
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            max_jitter: self.max_jitter,
            request_timeout: self.request_timeout,
        }
    }

    pub fn commitment_config(&self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment,
        }
    }

    /// --------------------------------------------------------------
    /// Convert to serializable format (for logging the effective config).
    /// --------------------------------------------------------------
    pub fn to_serializable(&self) -> SerializableSettings {
        SerializableSettings {
            rpc_url: self.rpc_url.clone(),
            relay_endpoints: self.relay_endpoints.clone(),
            commitment: self.commitment.to_string(),
            encoding: self.encoding,
            fanout: self.fanout,
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay.as_millis() as u64,
            max_delay_ms: self.max_delay.as_millis() as u64,
            max_jitter_ms: self.max_jitter.as_millis() as u64,
            request_timeout_ms: self.request_timeout.as_millis() as u64,
            confirm_timeout_ms: self.confirm_timeout.as_millis() as u64,
            confirm_poll_interval_ms: self.confirm_poll_interval.as_millis() as u64,
        }
    }
}

/* ------------------------------------------------------------------ */
/*  Manual Clone & Debug implementations (RpcClient isn’t Clone/Debug) */
/* ------------------------------------------------------------------ */
impl Clone for Settings {
    fn clone(&self) -> Self {
        Self {
            rpc_url: self.rpc_url.clone(),
            relay_endpoints: self.relay_endpoints.clone(),
            commitment: self.commitment,
            encoding: self.encoding,
            fanout: self.fanout,
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            max_jitter: self.max_jitter,
            request_timeout: self.request_timeout,
            confirm_timeout: self.confirm_timeout,
            confirm_poll_interval: self.confirm_poll_interval,
            rpc_client: Arc::clone(&self.rpc_client),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("rpc_url", &self.rpc_url)
            .field("relay_endpoints", &self.relay_endpoints)
            .field("commitment", &self.commitment)
            .field("encoding", &self.encoding)
            .field("fanout", &self.fanout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_defaults_from_empty_object() {
        let settings = Settings::from_json_str("{}").unwrap();

        assert_eq!(settings.relay_endpoints.len(), 5);
        assert_eq!(settings.relay_endpoints[0], DEFAULT_BLOCK_ENGINES[0]);
        assert_eq!(settings.commitment, CommitmentLevel::Confirmed);
        assert_eq!(settings.encoding, WireEncoding::Base58);
        assert_eq!(settings.fanout, FanoutMode::AwaitAll);
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.confirm_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_load_from_file_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "rpc_url": "http://127.0.0.1:8899",
                "relay_endpoints": ["https://relay-a/api/v1/bundles", "https://relay-b/api/v1/bundles"],
                "commitment": "processed",
                "encoding": "base64",
                "fanout": "first_success",
                "max_attempts": 3,
                "base_delay_ms": 250,
                "confirm_timeout_ms": 2000
            }}"#
        )
        .unwrap();

        let settings = Settings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(settings.relay_endpoints.len(), 2);
        assert_eq!(settings.commitment_config(), CommitmentConfig::processed());
        assert_eq!(settings.encoding, WireEncoding::Base64);
        assert_eq!(settings.fanout, FanoutMode::FirstSuccess);

        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(20_000));
        assert_eq!(settings.confirm_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_rejects_bad_config() {
        assert!(Settings::from_json_str(r#"{"relay_endpoints": []}"#).is_err());
        assert!(Settings::from_json_str(r#"{"max_attempts": 0}"#).is_err());
        assert!(Settings::from_json_str(r#"{"encoding": "hex"}"#).is_err());
        assert!(Settings::from_json_str(r#"{"commitment": "eventually"}"#).is_err());
        assert!(Settings::load_from_file("/nonexistent/settings.json").is_err());
    }

    #[tokio::test]
    async fn test_max_attempts_out_of_range() {
        let err = Settings::from_json_str(r#"{"max_attempts": 4294967297}"#).unwrap_err();
        assert!(format!("{err:#}").contains("max_attempts"));
    }

    #[tokio::test]
    async fn test_serializable_reports_effective_values() {
        let settings = Settings::from_json_str(r#"{"fanout": "first_success", "max_jitter_ms": 0}"#).unwrap();
        let value = serde_json::to_value(settings.to_serializable()).unwrap();

        assert_eq!(value["fanout"], "first_success");
        assert_eq!(value["encoding"], "base58");
        assert_eq!(value["commitment"], "confirmed");
        assert_eq!(value["max_jitter_ms"], 0);
        assert_eq!(value["relay_endpoints"].as_array().unwrap().len(), 5);
    }
}
