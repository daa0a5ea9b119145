//! Core functionality for the lockgate project
//!
//! lockgate tracks failed login attempts in a process-external shared cache
//! so that multiple web workers agree on whether a login identifier is
//! temporarily blocked from authenticating. Records expire on a sliding TTL
//! window owned by the cache backend.
//!
//! This crate holds the counting and sweep logic plus the backend adapter
//! interface; concrete cache backends live in their own crates (in-memory
//! and Redis).
//!
//! See [`AttemptCounter`] for the caller-facing counter,
//! [`SweepCoordinator`] for administrative bulk cleanup, and [`CacheStore`]
//! for the backend contract.
//!
//! Host authentication flows integrate the counter with ordinary calls:
//! check [`AttemptCounter::is_blocked`] before verifying credentials, then
//! [`AttemptCounter::record_failure`] after a failed verification or
//! [`AttemptCounter::clear`] after a successful one.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod services;

pub use cache::{
    AttemptRecord, CacheCapabilities, CacheStore, KEY_PREFIX, attempt_key, namespace_prefix,
    normalize_identifier,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LockoutConfig, LockoutSettings, SharedSettings};
pub use error::Error;
pub use events::{EventBus, EventHandler, LockoutEvent};
pub use services::{AttemptCounter, SweepCoordinator};
