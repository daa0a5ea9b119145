//! Lockout configuration.
//!
//! The two tunables (attempt threshold and block duration) come from an
//! administrative settings store owned by the host application. The counter
//! reads them through [`LockoutSettings`] on every operation instead of
//! caching them, so administrative changes take effect immediately for new
//! operations.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for login attempt blocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Failed attempts allowed before an identifier is considered blocked.
    /// Values below 1 are clamped to 1 when enforced.
    pub attempts_limit: i64,

    /// Sliding block window in minutes. Every recorded failure resets the
    /// record's TTL to this duration.
    pub block_minutes: i64,

    /// Whether the calling controller layer should notify when an
    /// identifier becomes blocked. Not read by the counter itself.
    pub blocked_notification: bool,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            attempts_limit: 5,
            block_minutes: 30,
            blocked_notification: false,
        }
    }
}

impl LockoutConfig {
    /// The enforced threshold: always at least 1, regardless of
    /// misconfiguration.
    pub fn effective_attempts_limit(&self) -> u32 {
        self.attempts_limit.max(1) as u32
    }

    /// The record TTL derived from `block_minutes`.
    pub fn block_ttl(&self) -> Duration {
        Duration::minutes(self.block_minutes)
    }
}

/// Source of the current lockout configuration.
///
/// Implementations must return the live configuration on every call; the
/// counter never caches the result between operations.
pub trait LockoutSettings: Send + Sync + 'static {
    fn current(&self) -> LockoutConfig;
}

/// Fixed settings: a plain config is its own source.
impl LockoutSettings for LockoutConfig {
    fn current(&self) -> LockoutConfig {
        self.clone()
    }
}

/// Mutable settings shared between the counter and an administrative
/// surface. Lock-free so reads on the authentication hot path never block
/// behind an administrative update.
pub struct SharedSettings {
    attempts_limit: AtomicI64,
    block_minutes: AtomicI64,
    blocked_notification: AtomicBool,
}

impl SharedSettings {
    pub fn new(config: LockoutConfig) -> Self {
        Self {
            attempts_limit: AtomicI64::new(config.attempts_limit),
            block_minutes: AtomicI64::new(config.block_minutes),
            blocked_notification: AtomicBool::new(config.blocked_notification),
        }
    }

    pub fn set_attempts_limit(&self, attempts_limit: i64) {
        self.attempts_limit.store(attempts_limit, Ordering::Relaxed);
    }

    pub fn set_block_minutes(&self, block_minutes: i64) {
        self.block_minutes.store(block_minutes, Ordering::Relaxed);
    }

    pub fn set_blocked_notification(&self, blocked_notification: bool) {
        self.blocked_notification
            .store(blocked_notification, Ordering::Relaxed);
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(LockoutConfig::default())
    }
}

impl LockoutSettings for SharedSettings {
    fn current(&self) -> LockoutConfig {
        LockoutConfig {
            attempts_limit: self.attempts_limit.load(Ordering::Relaxed),
            block_minutes: self.block_minutes.load(Ordering::Relaxed),
            blocked_notification: self.blocked_notification.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LockoutConfig::default();
        assert_eq!(config.attempts_limit, 5);
        assert_eq!(config.block_minutes, 30);
        assert!(!config.blocked_notification);
    }

    #[test]
    fn test_effective_attempts_limit_clamps() {
        for (configured, expected) in [(-5, 1), (0, 1), (1, 1), (3, 3), (100, 100)] {
            let config = LockoutConfig {
                attempts_limit: configured,
                ..LockoutConfig::default()
            };
            assert_eq!(config.effective_attempts_limit(), expected);
        }
    }

    #[test]
    fn test_block_ttl() {
        let config = LockoutConfig {
            block_minutes: 60,
            ..LockoutConfig::default()
        };
        assert_eq!(config.block_ttl(), Duration::minutes(60));
        assert_eq!(config.block_ttl().num_seconds(), 3600);
    }

    #[test]
    fn test_shared_settings_updates_are_visible() {
        let settings = SharedSettings::new(LockoutConfig {
            attempts_limit: 3,
            block_minutes: 10,
            blocked_notification: false,
        });
        assert_eq!(settings.current().attempts_limit, 3);

        settings.set_attempts_limit(10);
        settings.set_block_minutes(120);
        settings.set_blocked_notification(true);

        let current = settings.current();
        assert_eq!(current.attempts_limit, 10);
        assert_eq!(current.block_minutes, 120);
        assert!(current.blocked_notification);
    }

    #[test]
    fn test_config_is_its_own_source() {
        let config = LockoutConfig {
            attempts_limit: 7,
            ..LockoutConfig::default()
        };
        assert_eq!(config.current().attempts_limit, 7);
    }
}
