use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{AccountId, AccountView, error::EventError};

/// Represents events that can be emitted by the event bus
///
/// Account lifecycle events carry the redacted [`AccountView`]; security
/// events carry the account id and the numbers a monitoring system would alert
/// on. No event ever carries a secret or a credential hash.
#[derive(Debug, Clone)]
pub enum Event {
    AccountCreated(AccountView),
    AccountUpdated(AccountView),

    /// All sessions of an account were revoked, e.g. after a password change.
    SessionsCleared(AccountId),

    LoginSucceeded {
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    },

    /// Emitted for every rejected secret, including the one that locks.
    LoginFailed {
        account_id: AccountId,
        /// Failures counted in the current window, this one included
        failed_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// Emitted once, by the failure that reaches the threshold.
    AccountLocked {
        account_id: AccountId,
        failed_attempts: u32,
        locked_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// An administrator cleared the failure counter of a locked account.
    AccountUnlocked {
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    },

    PasswordUpdated {
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Event::AccountCreated(_) => "account_created",
            Event::AccountUpdated(_) => "account_updated",
            Event::SessionsCleared(_) => "sessions_cleared",
            Event::LoginSucceeded { .. } => "login_succeeded",
            Event::LoginFailed { .. } => "login_failed",
            Event::AccountLocked { .. } => "account_locked",
            Event::AccountUnlocked { .. } => "account_unlocked",
            Event::PasswordUpdated { .. } => "password_updated",
        }
    }
}

/// A trait for handling events emitted by the event bus
///
/// ```
/// # use bastion_core::events::{Event, EventHandler};
/// # use bastion_core::error::EventError;
/// # use async_trait::async_trait;
/// struct AuditLog;
///
/// #[async_trait]
/// impl EventHandler for AuditLog {
///     async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
///         println!("{}", event.name());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
///
/// Handlers run in registration order. The first handler error stops delivery
/// and is returned to the emitter.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Emit an event, logging instead of returning handler failures.
    ///
    /// Used on paths whose outcome must not depend on observers.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.emit(&event).await {
            tracing::warn!(error = %e, event = event.name(), "Event handler failed");
        }
    }
}
