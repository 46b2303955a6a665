//! Wire encoding for signed transactions sent to the block engine.
//!
//! Every transaction is bincode-serialized and then rendered as text. Base58
//! is what `sendBundle` expects by default; base64 has to be announced with an
//! explicit `{"encoding": "base64"}` param.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::VersionedTransaction;

use crate::submit::types::SubmitError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireEncoding {
    #[default]
    Base58,
    Base64,
}

impl WireEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireEncoding::Base58 => "base58",
            WireEncoding::Base64 => "base64",
        }
    }

    pub fn encode_bytes(&self, bytes: &[u8]) -> String {
        match self {
            WireEncoding::Base58 => bs58::encode(bytes).into_string(),
            WireEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode_str(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            WireEncoding::Base58 => bs58::decode(text)
                .into_vec()
                .context("decoding base58 transaction"),
            WireEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(text)
                .context("decoding base64 transaction"),
        }
    }
}

impl fmt::Display for WireEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base58" => Ok(WireEncoding::Base58),
            "base64" => Ok(WireEncoding::Base64),
            other => Err(anyhow!("unknown wire encoding `{other}`")),
        }
    }
}

/// Turns one signed transaction into its wire text.
pub trait TxEncoder: Send + Sync {
    fn encoding(&self) -> WireEncoding;

    fn encode(&self, tx: &VersionedTransaction) -> Result<String, bincode::Error>;
}

impl TxEncoder for WireEncoding {
    fn encoding(&self) -> WireEncoding {
        *self
    }

    fn encode(&self, tx: &VersionedTransaction) -> Result<String, bincode::Error> {
        let bytes = bincode::serialize(tx)?;
        Ok(self.encode_bytes(&bytes))
    }
}

/// A bundle rendered to wire text, shared read-only by every endpoint task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBundle {
    pub encoding: WireEncoding,
    pub transactions: Vec<String>,
}

impl EncodedBundle {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Encode every transaction exactly once, keeping bundle order.
pub fn encode_bundle(
    encoder: &dyn TxEncoder,
    transactions: &[VersionedTransaction],
) -> Result<EncodedBundle, SubmitError> {
    let mut encoded = Vec::with_capacity(transactions.len());
    for (index, tx) in transactions.iter().enumerate() {
        let text = encoder
            .encode(tx)
            .map_err(|source| SubmitError::Encode { index, source })?;
        encoded.push(text);
    }

    Ok(EncodedBundle {
        encoding: encoder.encoding(),
        transactions: encoded,
    })
}

/// Parse one wire-encoded signed transaction (used by the CLI tools).
pub fn decode_transaction(text: &str, encoding: WireEncoding) -> Result<VersionedTransaction> {
    let bytes = encoding.decode_str(text.trim())?;
    bincode::deserialize(&bytes).context("deserializing versioned transaction")
}
