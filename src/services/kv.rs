// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process key/value store with per-entry TTL.
//!
//! Each entry carries a string value and an optional JSON metadata blob.
//! Expired entries are never returned; they are dropped lazily on read and
//! in bulk by [`spawn_sweeper`].

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A live entry as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    pub value: String,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: KvEntry,
    expires_at: Instant,
}

/// Shared KV store type for use in AppState.
pub type SharedKv = Arc<KvStore>;

#[derive(Debug, Default)]
pub struct KvStore {
    entries: DashMap<String, StoredEntry>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        self.insert(key.into(), value.into(), None, ttl);
    }

    /// Store `value` with attached metadata, replacing any previous entry.
    pub fn put_with_metadata(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        metadata: Value,
        ttl: Duration,
    ) {
        self.insert(key.into(), value.into(), Some(metadata), ttl);
    }

    fn insert(&self, key: String, value: String, metadata: Option<Value>, ttl: Duration) {
        self.entries.insert(
            key,
            StoredEntry {
                entry: KvEntry { value, metadata },
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Value for `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_with_metadata(key).map(|e| e.value)
    }

    /// Value and metadata for `key`, if present and not expired.
    pub fn get_with_metadata(&self, key: &str) -> Option<KvEntry> {
        let now = Instant::now();

        match self.entries.get(key) {
            Some(stored) if stored.expires_at > now => return Some(stored.entry.clone()),
            Some(_) => {}
            None => return None,
        }

        // Expired: drop it unless a writer replaced it meanwhile.
        self.entries.remove_if(key, |_, stored| stored.expires_at <= now);
        None
    }

    /// Remove `key`. Returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove(key)
            .is_some_and(|(_, stored)| stored.expires_at > now)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Periodically purge expired entries for the lifetime of the process.
pub fn spawn_sweeper(store: SharedKv, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = store.len(), "Swept expired KV entries");
            }
        }
    })
}
