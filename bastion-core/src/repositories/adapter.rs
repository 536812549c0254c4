use crate::{
    Account, AccountId, Error, Session,
    repositories::{
        AccountRepository, FailureCounterRepository, RepositoryProvider, SessionRepository,
    },
    session::SessionToken,
    storage::FailureCounter,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements AccountRepository
pub struct AccountRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountRepository for AccountRepositoryAdapter<R> {
    async fn create(&self, account: Account) -> Result<Account, Error> {
        self.provider.account().create(account).await
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_email(email).await
    }

    async fn update(&self, account: &Account) -> Result<Account, Error> {
        self.provider.account().update(account).await
    }

    async fn set_password_hash(
        &self,
        id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.provider
            .account()
            .set_password_hash(id, password_hash, updated_at)
            .await
    }
}

/// Adapter that wraps a RepositoryProvider and implements FailureCounterRepository
pub struct FailureCounterRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> FailureCounterRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> FailureCounterRepository for FailureCounterRepositoryAdapter<R> {
    async fn get(&self, key: &str) -> Result<Option<FailureCounter>, Error> {
        self.provider.failure_counter().get(key).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        count: u32,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error> {
        self.provider
            .failure_counter()
            .set_with_ttl(key, count, now, ttl)
            .await
    }

    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error> {
        self.provider.failure_counter().increment(key, now, ttl).await
    }

    async fn clear(&self, key: &str) -> Result<bool, Error> {
        self.provider.failure_counter().clear(key).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.failure_counter().purge_expired(now).await
    }
}

/// Adapter that wraps a RepositoryProvider and implements SessionRepository
pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.provider.session().create(session).await
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        self.provider.session().find_by_token(token).await
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.provider.session().delete(token).await
    }

    async fn delete_by_account_id(&self, account_id: &AccountId) -> Result<u64, Error> {
        self.provider.session().delete_by_account_id(account_id).await
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.session().cleanup_expired(now).await
    }
}
