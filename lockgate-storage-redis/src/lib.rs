//! Redis cache store for lockgate.
//!
//! Stores each attempt record as a Redis hash with `failed_count` and
//! `updated_at` fields so the count can be incremented server-side: a
//! `MULTI`/`EXEC` pipeline of `HINCRBY` + `HSET` + `EXPIRE` gives atomic
//! increments with the sliding TTL reset, with no read-modify-write race
//! between worker processes. Prefix deletion walks the keyspace with
//! cursor `SCAN` so it never blocks the server the way `KEYS` would.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lockgate_core::{
    AttemptRecord, CacheCapabilities, CacheStore, Error,
    error::StorageError,
};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

const FIELD_FAILED_COUNT: &str = "failed_count";
const FIELD_UPDATED_AT: &str = "updated_at";

/// Redis implementation of the lockgate cache store.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    /// Create a store over a configured Redis client.
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Connect to the given Redis URL, e.g. `redis://localhost:6379/0`.
    pub fn open(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(|e| {
            StorageError::Connection(format!("invalid redis url: {e}"))
        })?;
        Ok(Self::new(client))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, Error> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to redis");
                StorageError::Connection(format!("failed to connect to redis: {e}")).into()
            })
    }
}

fn parse_updated_at(value: Option<String>) -> Result<DateTime<Utc>, Error> {
    let raw = value.ok_or_else(|| {
        StorageError::Serialization("attempt record is missing updated_at".to_string())
    })?;
    let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
        StorageError::Serialization(format!("invalid updated_at '{raw}': {e}"))
    })?;
    Ok(parsed.with_timezone(&Utc))
}

fn ttl_seconds(expires_in: Duration) -> i64 {
    // EXPIRE with a non-positive TTL deletes the key, which matches the
    // immediate-expiry semantics of a non-positive block window.
    expires_in.num_seconds().max(0)
}

#[async_trait]
impl CacheStore for RedisStore {
    fn capabilities(&self) -> CacheCapabilities {
        CacheCapabilities {
            atomic_increment: true,
            prefix_delete: true,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error> {
        let mut conn = self.connection().await?;

        let (failed_count, updated_at): (Option<u32>, Option<String>) = redis::cmd("HMGET")
            .arg(key)
            .arg(FIELD_FAILED_COUNT)
            .arg(FIELD_UPDATED_AT)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to read attempt record");
                StorageError::Backend(format!("failed to read attempt record: {e}"))
            })?;

        match failed_count {
            None => Ok(None),
            Some(failed_count) => Ok(Some(AttemptRecord {
                failed_count,
                updated_at: parse_updated_at(updated_at)?,
            })),
        }
    }

    async fn put(
        &self,
        key: &str,
        record: &AttemptRecord,
        expires_in: Duration,
    ) -> Result<(), Error> {
        let mut conn = self.connection().await?;

        redis::pipe()
            .atomic()
            .hset(key, FIELD_FAILED_COUNT, record.failed_count)
            .hset(key, FIELD_UPDATED_AT, record.updated_at.to_rfc3339())
            .expire(key, ttl_seconds(expires_in))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to write attempt record");
                StorageError::Backend(format!("failed to write attempt record: {e}")).into()
            })
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut conn = self.connection().await?;

        let _: () = conn.del(key).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to delete attempt record");
            StorageError::Backend(format!("failed to delete attempt record: {e}"))
        })?;

        Ok(())
    }

    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Result<AttemptRecord, Error> {
        let mut conn = self.connection().await?;

        let (failed_count,): (u32,) = redis::pipe()
            .atomic()
            .hincr(key, FIELD_FAILED_COUNT, 1)
            .hset(key, FIELD_UPDATED_AT, now.to_rfc3339())
            .ignore()
            .expire(key, ttl_seconds(expires_in))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to increment attempt record");
                StorageError::Backend(format!("failed to increment attempt record: {e}"))
            })?;

        Ok(AttemptRecord {
            failed_count,
            updated_at: now,
        })
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let mut conn = self.connection().await?;
        let pattern = format!("{prefix}*");

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to scan attempt records");
                    StorageError::Backend(format!("failed to scan attempt records: {e}"))
                })?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to delete attempt records");
            StorageError::Backend(format!("failed to delete attempt records: {e}"))
        })?;

        Ok(deleted)
    }
}
