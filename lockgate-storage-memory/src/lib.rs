//! In-memory cache store for lockgate.
//!
//! Backed by a [`DashMap`] with per-entry expiry computed from an
//! injectable clock. Counts held here are visible to a single process
//! only, so this store suits single-worker deployments and tests; shared
//! multi-process deployments should use a process-external backend such as
//! `lockgate-storage-redis`.
//!
//! Expired entries are evicted lazily on read. A deployment that wants
//! active eviction can run `SweepCoordinator::start_sweep_task` against
//! this store, since it supports prefix deletion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use lockgate_core::{
    AttemptRecord, CacheCapabilities, CacheStore, Clock, Error, SystemClock,
};

#[derive(Debug, Clone)]
struct Entry {
    record: AttemptRecord,
    expires_at: DateTime<Utc>,
}

pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store whose expiry decisions follow `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of entries currently held, including not-yet-evicted expired
    /// ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live(&self, key: &str) -> Option<AttemptRecord> {
        let now = self.clock.now();
        {
            let entry = self.entries.get(key)?;
            if entry.expires_at > now {
                return Some(entry.record.clone());
            }
        }
        // Expired: evict lazily. The guard above must be dropped first.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn capabilities(&self) -> CacheCapabilities {
        CacheCapabilities {
            atomic_increment: true,
            prefix_delete: true,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error> {
        Ok(self.live(key))
    }

    async fn put(
        &self,
        key: &str,
        record: &AttemptRecord,
        expires_in: Duration,
    ) -> Result<(), Error> {
        let expires_at = self.clock.now() + expires_in;
        self.entries.insert(
            key.to_string(),
            Entry {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }

    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Result<AttemptRecord, Error> {
        let store_now = self.clock.now();
        let expires_at = store_now + expires_in;

        // The entry guard holds the shard lock, making the
        // read-modify-write atomic per key.
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            record: AttemptRecord {
                failed_count: 0,
                updated_at: now,
            },
            expires_at,
        });
        if entry.expires_at <= store_now {
            // Expired but not yet evicted: start a fresh record.
            entry.record.failed_count = 0;
        }
        entry.record.failed_count += 1;
        entry.record.updated_at = now;
        entry.expires_at = expires_at;

        Ok(entry.record.clone())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let mut removed = 0u64;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}
