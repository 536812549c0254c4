//! In-memory storage backend
//!
//! Backed by [`dashmap`] so every repository can be shared across tasks
//! without an outer lock. Per-key atomicity comes from the map's entry API,
//! which holds the shard lock for the whole read-modify-write.
//!
//! Nothing is persisted; restarting the process forgets every account,
//! counter and session.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    Account, AccountId, Error, Session,
    error::{AuthError, StorageError},
    repositories::{
        AccountRepository, AccountRepositoryProvider, FailureCounterRepository,
        FailureCounterRepositoryProvider, RepositoryProvider, SessionRepository,
        SessionRepositoryProvider,
    },
    session::SessionToken,
    storage::FailureCounter,
};

#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
    usernames: DashMap<String, AccountId>,
    emails: DashMap<String, AccountId>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, index: &DashMap<String, AccountId>, key: &str) -> Option<Account> {
        let id = index.get(key).map(|id| id.value().clone())?;
        self.accounts.get(&id).map(|account| account.value().clone())
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, Error> {
        match self.usernames.entry(account.username.clone()) {
            Entry::Occupied(_) => {
                return Err(AuthError::AccountAlreadyExists("username".to_string()).into());
            }
            Entry::Vacant(slot) => {
                slot.insert(account.id.clone());
            }
        }

        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => {
                self.usernames.remove(&account.username);
                return Err(AuthError::AccountAlreadyExists("email".to_string()).into());
            }
            Entry::Vacant(slot) => {
                slot.insert(account.id.clone());
            }
        }

        self.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        Ok(self.accounts.get(id).map(|account| account.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        Ok(self.lookup(&self.usernames, username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        Ok(self.lookup(&self.emails, email))
    }

    async fn update(&self, account: &Account) -> Result<Account, Error> {
        let mut stored = self
            .accounts
            .get_mut(&account.id)
            .ok_or(StorageError::NotFound)?;

        stored.nickname = account.nickname.clone();
        stored.avatar = account.avatar.clone();
        stored.description = account.description.clone();
        stored.updated_at = account.updated_at;

        Ok(stored.value().clone())
    }

    async fn set_password_hash(
        &self,
        id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut stored = self.accounts.get_mut(id).ok_or(StorageError::NotFound)?;
        stored.password_hash = password_hash.to_string();
        stored.updated_at = updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFailureCounterRepository {
    counters: DashMap<String, FailureCounter>,
}

impl MemoryFailureCounterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FailureCounterRepository for MemoryFailureCounterRepository {
    async fn get(&self, key: &str) -> Result<Option<FailureCounter>, Error> {
        Ok(self.counters.get(key).map(|counter| counter.value().clone()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        count: u32,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error> {
        let counter = FailureCounter {
            key: key.to_string(),
            count,
            created_at: now,
            expires_at: now + ttl,
        };
        self.counters.insert(key.to_string(), counter.clone());
        Ok(counter)
    }

    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error> {
        let counter = match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let counter = slot.get_mut();
                if counter.is_expired(now) {
                    *counter = FailureCounter::first(key, now, ttl);
                } else {
                    counter.count = counter.count.saturating_add(1);
                }
                counter.clone()
            }
            Entry::Vacant(slot) => slot
                .insert(FailureCounter::first(key, now, ttl))
                .value()
                .clone(),
        };
        Ok(counter)
    }

    async fn clear(&self, key: &str) -> Result<bool, Error> {
        Ok(self.counters.remove(key).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0u64;
        self.counters.retain(|_, counter| {
            let keep = counter.is_active(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

/// Sessions keyed by the hash of their token.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<String, Session>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.sessions.insert(session.token.hash(), session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        Ok(self
            .sessions
            .get(&token.hash())
            .map(|session| session.value().clone()))
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.sessions.remove(&token.hash());
        Ok(())
    }

    async fn delete_by_account_id(&self, account_id: &AccountId) -> Result<u64, Error> {
        let mut removed = 0u64;
        self.sessions.retain(|_, session| {
            let keep = session.account_id != *account_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0u64;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

/// A [`RepositoryProvider`] that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryRepositoryProvider {
    accounts: MemoryAccountRepository,
    failure_counters: MemoryFailureCounterRepository,
    sessions: MemorySessionRepository,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountRepositoryProvider for MemoryRepositoryProvider {
    type AccountRepo = MemoryAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.accounts
    }
}

impl FailureCounterRepositoryProvider for MemoryRepositoryProvider {
    type FailureCounterRepo = MemoryFailureCounterRepository;

    fn failure_counter(&self) -> &Self::FailureCounterRepo {
        &self.failure_counters
    }
}

impl SessionRepositoryProvider for MemoryRepositoryProvider {
    type SessionRepo = MemorySessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.sessions
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, NewAccount};
    use std::sync::Arc;

    fn account(username: &str, email: &str) -> Account {
        NewAccount::builder()
            .username(username)
            .email(email)
            .build()
            .unwrap()
            .into_account("hash".to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_account_lookup_by_each_identifier() {
        let repo = MemoryAccountRepository::new();
        let created = repo
            .create(account("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        let by_username = repo.find_by_username("alice").await.unwrap().unwrap();
        let by_email = repo
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(by_id.id, created.id);
        assert_eq!(by_username.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_conflict() {
        let repo = MemoryAccountRepository::new();
        repo.create(account("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = repo
            .create(account("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = repo
            .create(account("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // The rejected "bob" must not have claimed the username
        repo.create(account("bob", "bob@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_password_hash_missing_account() {
        let repo = MemoryAccountRepository::new();
        let err = repo
            .set_password_hash(&AccountId::new("acc_missing"), "hash", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_increment_keeps_window_and_restarts_after_expiry() {
        let repo = MemoryFailureCounterRepository::new();
        let start = Utc::now();
        let ttl = Duration::minutes(10);

        let first = repo.increment("k", start, ttl).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.expires_at, start + ttl);

        let second = repo
            .increment("k", start + Duration::minutes(5), ttl)
            .await
            .unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.expires_at, start + ttl);

        let restarted = repo.increment("k", start + ttl, ttl).await.unwrap();
        assert_eq!(restarted.count, 1);
        assert_eq!(restarted.created_at, start + ttl);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let repo = Arc::new(MemoryFailureCounterRepository::new());
        let now = Utc::now();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.increment("k", now, Duration::minutes(10))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.get("k").await.unwrap().unwrap().count, 50);
    }

    #[tokio::test]
    async fn test_clear_and_purge() {
        let repo = MemoryFailureCounterRepository::new();
        let now = Utc::now();

        repo.set_with_ttl("a", 3, now, Duration::minutes(1))
            .await
            .unwrap();
        repo.set_with_ttl("b", 1, now, Duration::minutes(20))
            .await
            .unwrap();

        assert!(repo.clear("a").await.unwrap());
        assert!(!repo.clear("a").await.unwrap());

        repo.set_with_ttl("a", 3, now, Duration::minutes(1))
            .await
            .unwrap();
        let purged = repo
            .purge_expired(now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(repo.get("a").await.unwrap().is_none());
        assert!(repo.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sessions_by_token_and_account() {
        let repo = MemorySessionRepository::new();
        let alice = AccountId::new("acc_alice");
        let now = Utc::now();

        let first = Session::builder()
            .account_id(alice.clone())
            .created_at(now)
            .build()
            .unwrap();
        let second = Session::builder()
            .account_id(alice.clone())
            .created_at(now)
            .expires_in(Duration::minutes(1))
            .build()
            .unwrap();
        repo.create(first.clone()).await.unwrap();
        repo.create(second.clone()).await.unwrap();

        let found = repo.find_by_token(&first.token).await.unwrap().unwrap();
        assert_eq!(found.account_id, alice);

        assert_eq!(
            repo.cleanup_expired(now + Duration::minutes(2))
                .await
                .unwrap(),
            1
        );
        assert!(repo.find_by_token(&second.token).await.unwrap().is_none());

        assert_eq!(repo.delete_by_account_id(&alice).await.unwrap(), 1);
        assert!(repo.find_by_token(&first.token).await.unwrap().is_none());
    }
}
