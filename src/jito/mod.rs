//! Jito block-engine plumbing: wire encoding and the HTTP relay transport.

pub mod encoding;
pub mod relay;

pub use encoding::{decode_transaction, encode_bundle, EncodedBundle, TxEncoder, WireEncoding};
pub use relay::{BundleStatus, JitoRelay, RelayError};

/// Block engines accept at most this many transactions per bundle.
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;

/// Mainnet block-engine bundle endpoints (used when settings list none)
pub const DEFAULT_BLOCK_ENGINES: &[&str] = &[
    "https://mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://amsterdam.mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://frankfurt.mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://ny.mainnet.block-engine.jito.wtf/api/v1/bundles",
    "https://tokyo.mainnet.block-engine.jito.wtf/api/v1/bundles",
];

/// Explorer page for a relay-assigned bundle id.
pub fn bundle_explorer_url(bundle_id: &str) -> String {
    format!("https://explorer.jito.wtf/bundle/{bundle_id}")
}
