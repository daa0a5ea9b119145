//! Cache backend adapter interface.
//!
//! Attempt records live in a process-external key-value cache so that every
//! web worker observes the same counts. The required surface is small: get,
//! set-with-TTL, delete. Atomic increment and prefix deletion are optional;
//! backends declare them through [`CacheCapabilities`] and call sites branch
//! on the flags checked once at service construction, never by probing the
//! default method implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, StorageError};

/// Stable key prefix shared by every lockgate deployment. External tooling
/// relies on the exact `{prefix}:invalid_account:{identifier}` shape for
/// prefix-matched bulk deletion.
pub const KEY_PREFIX: &str = "lockgate";

const KEY_NAMESPACE: &str = "invalid_account";

/// The persisted unit of state for one login identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Consecutive recorded failures since creation or the last clear.
    pub failed_count: u32,

    /// Timestamp of the last increment. Diagnostic only: expiry is
    /// delegated to the backend TTL, never computed from this field.
    pub updated_at: DateTime<Utc>,
}

/// Optional operations a cache backend supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCapabilities {
    /// The backend can atomically create-or-increment a record.
    pub atomic_increment: bool,

    /// The backend can delete every key under a prefix.
    pub prefix_delete: bool,
}

/// A shared key-value cache holding attempt records with per-key TTLs.
///
/// Every write (`put` or `increment`) resets the key's TTL to the full
/// `expires_in` duration: expiry is a sliding window from the most recent
/// write, not a fixed window from creation.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Which optional operations this backend supports.
    fn capabilities(&self) -> CacheCapabilities;

    /// Read the record for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error>;

    /// Write `record` under `key`, resetting the TTL to `expires_in`.
    async fn put(
        &self,
        key: &str,
        record: &AttemptRecord,
        expires_in: Duration,
    ) -> Result<(), Error>;

    /// Remove the record for `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Atomically create-or-increment the record for `key`, stamping
    /// `updated_at` with `now` and resetting the TTL. Returns the updated
    /// record.
    ///
    /// Only called when [`CacheCapabilities::atomic_increment`] is true.
    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Result<AttemptRecord, Error> {
        let _ = (key, now, expires_in);
        Err(StorageError::Unsupported("atomic increment").into())
    }

    /// Delete every key starting with `prefix`, returning the number of
    /// keys removed.
    ///
    /// Only called when [`CacheCapabilities::prefix_delete`] is true.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let _ = prefix;
        Err(StorageError::Unsupported("prefix delete").into())
    }
}

/// Cache key for a normalized identifier.
pub fn attempt_key(identifier: &str) -> String {
    format!("{KEY_PREFIX}:{KEY_NAMESPACE}:{identifier}")
}

/// Prefix shared by every attempt key, used for bulk deletion.
pub fn namespace_prefix() -> String {
    format!("{KEY_PREFIX}:{KEY_NAMESPACE}:")
}

/// Case-fold a raw login name into its record key form. Returns `None` for
/// empty or whitespace-only input, which callers treat as "nothing to
/// record".
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
