use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    AccountId, Clock, Error, Session,
    error::SessionError,
    repositories::SessionRepository,
    session::{SessionSink, SessionToken},
    storage::SessionConfig,
};

/// Service for session lifecycle
pub struct SessionService<S: SessionRepository> {
    repository: Arc<S>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl<S: SessionRepository> SessionService<S> {
    pub fn new(repository: Arc<S>, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    /// Create a new session for an account
    pub async fn create_session(
        &self,
        account_id: &AccountId,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Result<Session, Error> {
        let session = Session::builder()
            .account_id(account_id.clone())
            .user_agent(user_agent)
            .ip_address(ip_address)
            .created_at(self.clock.now())
            .expires_in(self.config.expires_in)
            .build()?;

        self.repository.create(session).await
    }

    /// Resolve a token to a live session
    ///
    /// An expired session is deleted on sight and reported as
    /// [`SessionError::Expired`].
    pub async fn get_session(&self, token: &SessionToken) -> Result<Session, Error> {
        let session = self
            .repository
            .find_by_token(token)
            .await?
            .ok_or(SessionError::NotFound)?;

        if session.is_expired_at(self.clock.now()) {
            self.repository.delete(token).await?;
            return Err(SessionError::Expired.into());
        }

        Ok(session)
    }

    pub async fn delete_session(&self, token: &SessionToken) -> Result<(), Error> {
        self.repository.delete(token).await
    }

    pub async fn delete_sessions_for_account(&self, account_id: &AccountId) -> Result<u64, Error> {
        self.repository.delete_by_account_id(account_id).await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, Error> {
        self.repository.cleanup_expired(self.clock.now()).await
    }
}

/// A one-shot [`SessionSink`] that opens a session when the guard binds an
/// account to the current request.
pub struct SessionBinding<S: SessionRepository> {
    sessions: Arc<SessionService<S>>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    session: Mutex<Option<Session>>,
}

impl<S: SessionRepository> SessionBinding<S> {
    pub fn new(
        sessions: Arc<SessionService<S>>,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            sessions,
            user_agent,
            ip_address,
            session: Mutex::new(None),
        }
    }

    /// The session opened by [`SessionSink::bind`], if it ran.
    pub fn into_session(self) -> Option<Session> {
        self.session
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<S: SessionRepository> SessionSink for SessionBinding<S> {
    async fn bind(&self, account_id: &AccountId) -> Result<(), Error> {
        if self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
        {
            return Err(SessionError::AlreadyBound.into());
        }

        let session = self
            .sessions
            .create_session(account_id, self.user_agent.clone(), self.ip_address.clone())
            .await?;

        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
        Ok(())
    }
}
