//! Scripted relay/ledger doubles shared by the submission tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use tokio::time::{sleep, Instant};

use crate::jito::{EncodedBundle, RelayError, TxEncoder, WireEncoding};
use crate::submit::iface::{LedgerClient, RelayTransport};
use crate::submit::types::{BlockhashRef, ConfirmationStatus};

#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Accept(Option<String>),
    Reject(RelayError),
    /// Never answers.
    Hang,
}

/// Replies are consumed in order per url; the last one repeats forever.
#[derive(Default)]
pub(crate) struct ScriptedRelay {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    latency: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, Vec<Instant>>>,
    payloads: Mutex<Vec<EncodedBundle>>,
}

impl ScriptedRelay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    /// Every reply from `url` is delayed by `latency`.
    pub(crate) fn latency(mut self, url: &str, latency: Duration) -> Self {
        self.latency.insert(url.to_string(), latency);
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.call_times(url).len()
    }

    pub(crate) fn call_times(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().map(Vec::len).sum()
    }

    pub(crate) fn payloads(&self) -> Vec<EncodedBundle> {
        self.payloads.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(url) else {
            return Reply::Reject(RelayError::Transport(format!("no script for {url}")));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Reply::Reject(RelayError::Transport("empty script".into())))
        }
    }
}

#[async_trait]
impl RelayTransport for ScriptedRelay {
    async fn send_bundle(
        &self,
        url: &str,
        bundle: &EncodedBundle,
    ) -> Result<Option<String>, RelayError> {
        self.calls
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(Instant::now());
        self.payloads.lock().unwrap().push(bundle.clone());

        let reply = self.next_reply(url);
        if let Some(latency) = self.latency.get(url) {
            sleep(*latency).await;
        }

        match reply {
            Reply::Accept(bundle_id) => Ok(bundle_id),
            Reply::Reject(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum ConfirmBehavior {
    Confirmed,
    Hang,
    Error,
}

pub(crate) struct MockLedger {
    behavior: ConfirmBehavior,
    blockhash_unavailable: bool,
    pub(crate) blockhash: BlockhashRef,
    blockhash_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
    confirmed_with: Mutex<Option<(Signature, BlockhashRef)>>,
}

impl MockLedger {
    pub(crate) fn new(behavior: ConfirmBehavior) -> Self {
        Self {
            behavior,
            blockhash_unavailable: false,
            blockhash: BlockhashRef {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 300,
            },
            blockhash_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
            confirmed_with: Mutex::new(None),
        }
    }

    /// Every `latest_blockhash` call fails.
    pub(crate) fn without_blockhash(mut self) -> Self {
        self.blockhash_unavailable = true;
        self
    }

    pub(crate) fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn confirmed_with(&self) -> Option<(Signature, BlockhashRef)> {
        *self.confirmed_with.lock().unwrap()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_blockhash(&self, _commitment: CommitmentConfig) -> anyhow::Result<BlockhashRef> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        if self.blockhash_unavailable {
            anyhow::bail!("getLatestBlockhash: node is behind");
        }
        Ok(self.blockhash)
    }

    async fn confirm_signature(
        &self,
        signature: &Signature,
        blockhash: &BlockhashRef,
        _commitment: CommitmentConfig,
    ) -> anyhow::Result<ConfirmationStatus> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        *self.confirmed_with.lock().unwrap() = Some((*signature, *blockhash));
        match self.behavior {
            ConfirmBehavior::Confirmed => Ok(ConfirmationStatus::Confirmed),
            ConfirmBehavior::Error => Err(anyhow::anyhow!("rpc node unreachable")),
            ConfirmBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Counts how many transactions went through serialization.
#[derive(Default)]
pub(crate) struct CountingEncoder {
    encoded: AtomicUsize,
}

impl CountingEncoder {
    pub(crate) fn count(&self) -> usize {
        self.encoded.load(Ordering::SeqCst)
    }
}

impl TxEncoder for CountingEncoder {
    fn encoding(&self) -> WireEncoding {
        WireEncoding::Base58
    }

    fn encode(&self, tx: &VersionedTransaction) -> Result<String, bincode::Error> {
        self.encoded.fetch_add(1, Ordering::SeqCst);
        WireEncoding::Base58.encode(tx)
    }
}

pub(crate) fn signed_transfer(payer: &Keypair) -> VersionedTransaction {
    let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 5_000);
    let msg = Message::new_with_blockhash(&[ix], Some(&payer.pubkey()), &Hash::new_unique());
    VersionedTransaction::try_new(VersionedMessage::Legacy(msg), &[payer]).unwrap()
}

pub(crate) fn signed_bundle(len: usize) -> (Keypair, Vec<VersionedTransaction>) {
    let payer = Keypair::new();
    let txs = (0..len).map(|_| signed_transfer(&payer)).collect();
    (payer, txs)
}
