//! Failed-login-attempt counting and blocking.
//!
//! [`AttemptCounter`] answers "how many recent failures for this
//! identifier" and "is this identifier currently blocked", and mutates the
//! shared count safely under concurrent callers in multiple processes.
//!
//! Blocking is a derived predicate (`failed_count >= attempts_limit`), not
//! stored state: lowering the attempt limit retroactively blocks identifiers
//! whose existing counts now exceed it.
//!
//! # Example
//!
//! ```rust,ignore
//! use lockgate_core::{AttemptCounter, LockoutConfig};
//!
//! let counter = AttemptCounter::new(store, Arc::new(LockoutConfig::default()));
//!
//! // Check before attempting credential verification
//! if counter.is_blocked("bob").await? {
//!     // Reject without checking the password
//! }
//!
//! // Record after a failed verification, clear after a successful one
//! counter.record_failure("bob").await?;
//! counter.clear("bob").await?;
//! ```

use std::sync::Arc;

use crate::{
    Error,
    cache::{AttemptRecord, CacheCapabilities, CacheStore, attempt_key, normalize_identifier},
    clock::{Clock, SystemClock},
    config::LockoutSettings,
    events::{EventBus, LockoutEvent},
};

/// Counter for failed login attempts against one shared cache backend.
///
/// Holds no per-identifier state in process: every read goes back to the
/// shared backend so a block imposed by one worker is immediately visible
/// to all others. Settings are re-read on every operation so administrative
/// changes take effect immediately.
///
/// # Concurrency
///
/// When the backend supports atomic increment, concurrent `record_failure`
/// calls never lose counts. On the get/put fallback path the
/// read-modify-write is not atomic and two workers racing on the same
/// identifier can lose an increment. This is an accepted trade-off:
/// occasionally under-counting is judged less harmful than adding a
/// distributed-lock dependency to the authentication path.
pub struct AttemptCounter<C: CacheStore, S: LockoutSettings> {
    cache: Arc<C>,
    settings: Arc<S>,
    capabilities: CacheCapabilities,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl<C: CacheStore, S: LockoutSettings> AttemptCounter<C, S> {
    /// Create a counter over `cache`, snapshotting the backend's
    /// capabilities once.
    pub fn new(cache: Arc<C>, settings: Arc<S>) -> Self {
        let capabilities = cache.capabilities();
        Self {
            cache,
            settings,
            capabilities,
            events: EventBus::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the event bus observers are registered on.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Replace the time source. Tests use this with a manual clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The capability snapshot taken at construction.
    pub fn capabilities(&self) -> CacheCapabilities {
        self.capabilities
    }

    /// Record one failed login attempt for `identifier`.
    ///
    /// Creates the record at count 1 if absent, otherwise increments it;
    /// either way the TTL restarts at the full block duration. Empty or
    /// whitespace-only identifiers are a no-op, not an error.
    pub async fn record_failure(&self, identifier: &str) -> Result<(), Error> {
        let Some(identifier) = normalize_identifier(identifier) else {
            return Ok(());
        };
        let key = attempt_key(&identifier);
        let config = self.settings.current();
        let limit = config.effective_attempts_limit();
        let ttl = config.block_ttl();
        let now = self.clock.now();

        let record = if self.capabilities.atomic_increment {
            self.cache.increment(&key, now, ttl).await?
        } else {
            // Non-atomic read-modify-write: a concurrent writer between the
            // get and the put loses its increment.
            let failed_count = match self.cache.get(&key).await? {
                Some(existing) => existing.failed_count + 1,
                None => 1,
            };
            let record = AttemptRecord {
                failed_count,
                updated_at: now,
            };
            self.cache.put(&key, &record, ttl).await?;
            record
        };

        tracing::debug!(
            identifier = %identifier,
            failed_count = record.failed_count,
            "recorded failed login attempt"
        );

        // Counts move by single increments, so the crossing value is seen
        // by exactly one writer on the atomic path.
        if record.failed_count == limit {
            self.emit(LockoutEvent::IdentifierBlocked {
                identifier,
                failed_count: record.failed_count,
                timestamp: now,
            })
            .await;
        }

        Ok(())
    }

    /// The current failure count for `identifier`. Absence is zero, not an
    /// error.
    pub async fn failed_count(&self, identifier: &str) -> Result<u32, Error> {
        let Some(identifier) = normalize_identifier(identifier) else {
            return Ok(0);
        };
        let record = self.cache.get(&attempt_key(&identifier)).await?;
        Ok(record.map(|r| r.failed_count).unwrap_or(0))
    }

    /// The enforced attempt threshold: `max(configured, 1)`.
    pub fn attempts_limit(&self) -> u32 {
        self.settings.current().effective_attempts_limit()
    }

    /// Whether `identifier` is currently blocked from authenticating.
    pub async fn is_blocked(&self, identifier: &str) -> Result<bool, Error> {
        Ok(self.failed_count(identifier).await? >= self.attempts_limit())
    }

    /// Delete the record for `identifier`, typically on successful
    /// authentication. Idempotent: clearing an absent record is a no-op.
    pub async fn clear(&self, identifier: &str) -> Result<(), Error> {
        let Some(identifier) = normalize_identifier(identifier) else {
            return Ok(());
        };
        let key = attempt_key(&identifier);

        // The unblock event needs the prior count; only pay for the extra
        // read when someone is listening.
        let was_blocked = if self.events.has_handlers().await {
            let prior = self.cache.get(&key).await?;
            prior.map(|r| r.failed_count).unwrap_or(0) >= self.attempts_limit()
        } else {
            false
        };

        self.cache.delete(&key).await?;
        tracing::debug!(identifier = %identifier, "cleared login attempt record");

        if was_blocked {
            self.emit(LockoutEvent::IdentifierUnblocked {
                identifier,
                timestamp: self.clock.now(),
            })
            .await;
        }

        Ok(())
    }

    async fn emit(&self, event: LockoutEvent) {
        if let Err(error) = self.events.emit(&event).await {
            tracing::warn!(error = %error, "lockout event handler failed");
        }
    }
}
