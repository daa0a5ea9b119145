//! Best-effort bulk cleanup of attempt records.
//!
//! Used for administrative reset and scheduled maintenance, never on the
//! per-request path. A failed or unsupported sweep must never block
//! request handling, so every operation here logs and absorbs its errors.

use std::sync::Arc;

use crate::cache::{CacheCapabilities, CacheStore, namespace_prefix};

/// Bulk remover for every attempt record under the counter's key
/// namespace.
///
/// Capability-gated: on backends without prefix deletion both operations
/// are safe no-ops, which is not an error — the per-record TTL already
/// provides eventual cleanup.
pub struct SweepCoordinator<C: CacheStore> {
    cache: Arc<C>,
    capabilities: CacheCapabilities,
}

impl<C: CacheStore> Clone for SweepCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            capabilities: self.capabilities,
        }
    }
}

impl<C: CacheStore> SweepCoordinator<C> {
    pub fn new(cache: Arc<C>) -> Self {
        let capabilities = cache.capabilities();
        Self {
            cache,
            capabilities,
        }
    }

    /// Remove every attempt record. Returns the number of records removed;
    /// 0 when the backend lacks prefix deletion or the sweep failed.
    pub async fn clear_all(&self) -> u64 {
        if !self.capabilities.prefix_delete {
            tracing::debug!("cache backend does not support prefix deletion, skipping sweep");
            return 0;
        }

        match self.cache.delete_prefix(&namespace_prefix()).await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!(count = count, "cleared login attempt records");
                }
                count
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to clear login attempt records");
                0
            }
        }
    }

    /// Remove expired records. Every record already carries a TTL, so
    /// there is no "expired but not yet evicted" state to target
    /// selectively; this performs the same prefix delete as
    /// [`clear_all`](Self::clear_all) and exists for backends without
    /// native TTL eviction.
    pub async fn sweep_expired(&self) -> u64 {
        self.clear_all().await
    }

    /// Start a periodic sweep task.
    ///
    /// Runs [`sweep_expired`](Self::sweep_expired) every `interval` until
    /// the `shutdown` channel signals.
    pub fn start_sweep_task(
        &self,
        interval: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        coordinator.sweep_expired().await;
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt sweep task");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AttemptRecord, attempt_key};
    use crate::error::{Error, StorageError};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockCache {
        records: Mutex<HashMap<String, AttemptRecord>>,
        capabilities: CacheCapabilities,
        fail_sweep: bool,
    }

    impl MockCache {
        fn new(prefix_delete: bool) -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                capabilities: CacheCapabilities {
                    atomic_increment: false,
                    prefix_delete,
                },
                fail_sweep: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_sweep: true,
                ..Self::new(true)
            }
        }

        fn insert(&self, key: &str) {
            self.records.lock().unwrap().insert(
                key.to_string(),
                AttemptRecord {
                    failed_count: 1,
                    updated_at: Utc::now(),
                },
            );
        }

        fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CacheStore for MockCache {
        fn capabilities(&self) -> CacheCapabilities {
            self.capabilities
        }

        async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        async fn put(
            &self,
            key: &str,
            record: &AttemptRecord,
            _expires_in: Duration,
        ) -> Result<(), Error> {
            self.records
                .lock()
                .unwrap()
                .insert(key.to_string(), record.clone());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), Error> {
            self.records.lock().unwrap().remove(key);
            Ok(())
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<u64, Error> {
            if self.fail_sweep {
                return Err(StorageError::Backend("sweep failed".to_string()).into());
            }
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|key, _| !key.starts_with(prefix));
            Ok((before - records.len()) as u64)
        }
    }

    #[tokio::test]
    async fn test_clear_all_removes_only_namespace_keys() {
        let cache = Arc::new(MockCache::new(true));
        cache.insert(&attempt_key("bob"));
        cache.insert(&attempt_key("fred"));
        cache.insert("unrelated:key");

        let sweeper = SweepCoordinator::new(cache.clone());
        let removed = sweeper.clear_all().await;

        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("unrelated:key").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_all_without_capability_is_noop() {
        let cache = Arc::new(MockCache::new(false));
        cache.insert(&attempt_key("bob"));

        let sweeper = SweepCoordinator::new(cache.clone());
        assert_eq!(sweeper.clear_all().await, 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_errors_are_absorbed() {
        let cache = Arc::new(MockCache::failing());
        let sweeper = SweepCoordinator::new(cache);

        // The backend error must not surface
        assert_eq!(sweeper.clear_all().await, 0);
        assert_eq!(sweeper.sweep_expired().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_expired_matches_clear_all() {
        let cache = Arc::new(MockCache::new(true));
        cache.insert(&attempt_key("bob"));
        cache.insert(&attempt_key("fred"));

        let sweeper = SweepCoordinator::new(cache.clone());
        assert_eq!(sweeper.sweep_expired().await, 2);
        assert_eq!(cache.len(), 0);
    }
}
