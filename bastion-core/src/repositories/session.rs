use crate::{AccountId, Error, Session, session::SessionToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for session data access
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Create a new session
    async fn create(&self, session: Session) -> Result<Session, Error>;

    /// Find a session by token
    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error>;

    /// Delete a session by token
    async fn delete(&self, token: &SessionToken) -> Result<(), Error>;

    /// Delete all sessions for an account, returning how many were removed
    async fn delete_by_account_id(&self, account_id: &AccountId) -> Result<u64, Error>;

    /// Clean up sessions expired at `now`
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
