//! Two-tier word suppression.
//!
//! A flagged word can be silenced two ways: permanently (the user's personal
//! dictionary, persisted across sessions through the host's key-value store)
//! or for the current message only (cleared when the composer is detected to
//! have been emptied by a send). A word is suppressed when it matches either
//! tier; comparisons are always case-insensitive, so both tiers store
//! case-folded keys and queries fold before lookup.
//!
//! Persistence failures degrade to an empty in-memory durable set for the
//! session. The store never retries on its own.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed key the durable list lives under in the host's KV store.
pub const IGNORED_WORDS_KEY: &str = "quillcheck.ignored-words";

/// Asynchronous key-value persistence collaborator supplied by the host.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One durable record: a case-folded word and when it was last touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedWord {
    pub word: String,
    pub timestamp: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct SuppressionStore {
    /// Insertion-ordered durable records (the on-disk shape).
    durable: Vec<SuppressedWord>,
    /// Per-message ignores, wiped on the send heuristic.
    volatile: HashSet<String>,
}

impl SuppressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the durable tier. Any persistence or decode failure falls back
    /// to an empty set; the session continues without permanent ignores.
    pub async fn load(kv: &dyn KvStore) -> Self {
        let mut store = Self::new();
        match kv.get(IGNORED_WORDS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SuppressedWord>>(&raw) {
                Ok(words) => {
                    debug!(target: "suppress", count = words.len(), "durable_words_loaded");
                    store.durable = words
                        .into_iter()
                        .map(|w| SuppressedWord {
                            word: w.word.to_lowercase(),
                            timestamp: w.timestamp,
                        })
                        .collect();
                }
                Err(e) => {
                    warn!(target: "suppress", error = %e, "durable_words_malformed_starting_empty");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(target: "suppress", error = %e, "durable_words_load_failed_starting_empty");
            }
        }
        store
    }

    /// Write the durable tier back under [`IGNORED_WORDS_KEY`].
    pub async fn save(&self, kv: &dyn KvStore) -> Result<()> {
        let raw = serde_json::to_string(&self.durable)?;
        kv.set(IGNORED_WORDS_KEY, &raw).await
    }

    /// Add to the personal dictionary. Returns false when already present.
    pub fn add_durable(&mut self, word: &str) -> bool {
        let folded = word.to_lowercase();
        if self.durable.iter().any(|w| w.word == folded) {
            return false;
        }
        self.durable.push(SuppressedWord {
            word: folded,
            timestamp: now_ms(),
        });
        true
    }

    /// Remove from the personal dictionary. Returns false when absent.
    pub fn remove_durable(&mut self, word: &str) -> bool {
        let folded = word.to_lowercase();
        let before = self.durable.len();
        self.durable.retain(|w| w.word != folded);
        self.durable.len() != before
    }

    pub fn clear_durable(&mut self) {
        self.durable.clear();
    }

    /// Ignore for the remainder of the current message only.
    pub fn add_volatile(&mut self, word: &str) {
        self.volatile.insert(word.to_lowercase());
    }

    /// Wipe the per-message tier (message-send transition).
    pub fn clear_volatile(&mut self) {
        self.volatile.clear();
    }

    pub fn volatile_is_empty(&self) -> bool {
        self.volatile.is_empty()
    }

    /// True when the word matches either tier, case-insensitively.
    pub fn is_suppressed(&self, word: &str) -> bool {
        let folded = word.to_lowercase();
        self.volatile.contains(&folded) || self.durable.iter().any(|w| w.word == folded)
    }

    /// Durable words in insertion order (the ignore-list editor's chips).
    pub fn durable_words(&self) -> Vec<&str> {
        self.durable.iter().map(|w| w.word.as_str()).collect()
    }

    pub fn durable_len(&self) -> usize {
        self.durable.len()
    }
}
