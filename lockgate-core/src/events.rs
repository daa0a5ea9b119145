//! Block and unblock notifications.
//!
//! The counter reports threshold crossings to caller-supplied observers:
//! security monitoring, audit logging, or the notification email the host
//! application sends when an account becomes blocked. Handler failures are
//! logged and absorbed by the counter; they never affect the counting
//! result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::EventError;

/// Events emitted when an identifier crosses the blocking threshold.
#[derive(Debug, Clone)]
pub enum LockoutEvent {
    /// A recorded failure pushed the identifier to the attempt limit.
    IdentifierBlocked {
        /// The normalized login identifier.
        identifier: String,
        /// The failure count after the recording write.
        failed_count: u32,
        /// When the blocking failure was recorded.
        timestamp: DateTime<Utc>,
    },

    /// A blocked identifier was explicitly cleared.
    ///
    /// TTL expiry is not observable as an event; it surfaces only as
    /// `failed_count` returning to zero.
    IdentifierUnblocked {
        /// The normalized login identifier.
        identifier: String,
        /// When the record was cleared.
        timestamp: DateTime<Utc>,
    },
}

/// A handler registered with the [`EventBus`] to receive lockout events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &LockoutEvent) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler with the event bus.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Whether any handlers are registered. Lets callers skip work that is
    /// only needed to build an event payload.
    pub async fn has_handlers(&self) -> bool {
        !self.handlers.read().await.is_empty()
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: &LockoutEvent) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        call_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_event(&self, _event: &LockoutEvent) -> Result<(), EventError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ErroringHandler;

    #[async_trait]
    impl EventHandler for ErroringHandler {
        async fn handle_event(&self, _event: &LockoutEvent) -> Result<(), EventError> {
            Err(EventError::HandlerError("test error".into()))
        }
    }

    fn blocked_event() -> LockoutEvent {
        LockoutEvent::IdentifierBlocked {
            identifier: "bob".to_string(),
            failed_count: 3,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_empty() {
        let event_bus = EventBus::default();
        assert!(!event_bus.has_handlers().await);

        // Should succeed with no handlers
        event_bus
            .emit(&blocked_event())
            .await
            .expect("Failed to emit event");
    }

    #[tokio::test]
    async fn test_event_bus_multiple_handlers() {
        let event_bus = EventBus::default();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        event_bus
            .register(Arc::new(CountingHandler {
                call_count: count1.clone(),
            }))
            .await;
        event_bus
            .register(Arc::new(CountingHandler {
                call_count: count2.clone(),
            }))
            .await;

        assert!(event_bus.has_handlers().await);

        event_bus
            .emit(&blocked_event())
            .await
            .expect("Failed to emit event");

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_event_bus_error_propagation() {
        let event_bus = EventBus::default();
        event_bus.register(Arc::new(ErroringHandler)).await;

        let result = event_bus.emit(&blocked_event()).await;
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), EventError::HandlerError(_)));
    }
}
