//! # Bastion
//!
//! Bastion manages user accounts for your application: registration,
//! password login behind a lockout policy, opaque bearer sessions and
//! profile maintenance, on top of storage you own.
//!
//! After [`MAX_LOGIN_TRY`] consecutive failed logins an account is locked for
//! [`LOCK_MINUTES`] minutes. While locked every attempt is rejected, even one
//! with the right password. Both limits can be changed with
//! [`LockoutConfig`].
//!
//! ## Storage Support
//!
//! - In-memory (tests and prototypes)
//! - SQLite
//!
//! ## Example
//!
//! ```rust,no_run
//! use bastion::{BastionBuilder, NewAccount};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bastion = BastionBuilder::new()
//!         .with_sqlite("sqlite://bastion.db")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let params = NewAccount::builder()
//!         .username("alice")
//!         .email("alice@example.com")
//!         .build()?;
//!     bastion.create_account(params, "s3cr3t!").await?;
//!
//!     let (account, session) = bastion.login("alice", "s3cr3t!", None, None).await?;
//!     println!("{} logged in, token {}", account.username, session.token);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use bastion_core::{
    Argon2Hasher, SystemClock,
    error::SessionError,
    repositories::{
        AccountRepositoryAdapter, FailureCounterRepositoryAdapter, SessionRepositoryAdapter,
    },
    services::{AccountGuard, AccountService, LoginLockoutService, SessionBinding, SessionService},
    validation::{validate_new_account, validate_password},
};

mod builder;

pub use builder::{BastionBuilder, BastionBuilderError, NoStorage, WithStorage};

/// Re-export core types from bastion_core
pub use bastion_core::{
    Account, AccountId, AccountView, Clock, CredentialHasher, Error, ErrorKind, Event, EventBus,
    EventHandler, LOCK_MINUTES, LockoutConfig, LockoutStatus, MAX_LOGIN_TRY, ManualClock,
    NewAccount, ProfileUpdate, RepositoryProvider, Session, SessionConfig, SessionToken,
};

pub use bastion_core::error;

/// Re-export storage backends
pub use bastion_core::repositories::MemoryRepositoryProvider;

#[cfg(feature = "sqlite")]
pub use bastion_storage_sqlite::SqliteRepositoryProvider;

type Accounts<R> = AccountRepositoryAdapter<R>;
type Counters<R> = FailureCounterRepositoryAdapter<R>;
type Sessions<R> = SessionRepositoryAdapter<R>;

/// The account service facade.
///
/// `Bastion` wires the account, lockout and session services over one
/// [`RepositoryProvider`] and exposes the operations an application needs.
/// Every method returns [`Error`]; branch on [`Error::kind`] rather than on
/// messages.
pub struct Bastion<R: RepositoryProvider> {
    repositories: Arc<R>,
    accounts: Arc<AccountService<Accounts<R>>>,
    guard: Arc<AccountGuard<Accounts<R>, Counters<R>>>,
    lockout: Arc<LoginLockoutService<Counters<R>>>,
    sessions: Arc<SessionService<Sessions<R>>>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl<R: RepositoryProvider> Bastion<R> {
    /// Create a new instance with default lockout and session settings,
    /// the system clock and Argon2 password hashing.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::from_parts(
            repositories,
            LockoutConfig::default(),
            SessionConfig::default(),
            Arc::new(SystemClock),
            Arc::new(Argon2Hasher),
        )
    }

    pub(crate) fn from_parts(
        repositories: Arc<R>,
        lockout_config: LockoutConfig,
        session_config: SessionConfig,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let account_repo = Arc::new(AccountRepositoryAdapter::new(repositories.clone()));
        let counter_repo = Arc::new(FailureCounterRepositoryAdapter::new(repositories.clone()));
        let session_repo = Arc::new(SessionRepositoryAdapter::new(repositories.clone()));
        let events = EventBus::new();

        let lockout = Arc::new(LoginLockoutService::new(
            counter_repo,
            lockout_config,
            clock.clone(),
        ));
        let guard = Arc::new(AccountGuard::new(
            account_repo.clone(),
            lockout.clone(),
            hasher,
            clock.clone(),
            events.clone(),
        ));

        Self {
            repositories,
            accounts: Arc::new(AccountService::new(account_repo, clock.clone())),
            guard,
            lockout,
            sessions: Arc::new(SessionService::new(
                session_repo,
                session_config,
                clock.clone(),
            )),
            events,
            clock,
        }
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// The bus every account and login event is published on.
    ///
    /// Register handlers here to build audit logs or notifications. A failing
    /// handler is logged and never changes the result of an operation.
    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `Validation` if the username, email, nickname or password is malformed
    /// - `Auth(AccountAlreadyExists)` if the username or email is taken
    pub async fn create_account(
        &self,
        params: NewAccount,
        password: &str,
    ) -> Result<AccountView, Error> {
        validate_new_account(&params)?;
        validate_password(password)?;

        self.guard.create_account(params, password).await
    }

    /// Log in with a username or email and open a session.
    ///
    /// # Arguments
    ///
    /// * `identifier` - Username, or email if no username matches
    /// * `password` - The account password
    /// * `user_agent` - Optional user agent to record on the session
    /// * `ip_address` - Optional IP address to record on the session
    ///
    /// # Errors
    ///
    /// - `Auth(AccountNotFound)` if nothing matches `identifier`
    /// - `Auth(AccountLocked)` while the account is locked out
    /// - `Auth(InvalidCredentials)` if the password is wrong
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Result<(AccountView, Session), Error> {
        let binding = SessionBinding::new(self.sessions.clone(), user_agent, ip_address);
        let account = self
            .guard
            .authenticate(identifier, password, &binding)
            .await?;
        let session = binding.into_session().ok_or(SessionError::NotFound)?;

        Ok((account, session))
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &SessionToken) -> Result<(), Error> {
        self.sessions.delete_session(token).await
    }

    /// Resolve a session token to the account it belongs to.
    pub async fn current_account(&self, token: &SessionToken) -> Result<AccountView, Error> {
        let session = self.sessions.get_session(token).await?;
        self.accounts.get_by_id_or_err(&session.account_id).await
    }

    /// Change an account's password and end all of its sessions.
    ///
    /// A wrong `old_password` fails with `InvalidCredentials` and does not
    /// count towards the lockout.
    pub async fn change_password(
        &self,
        account_id: &AccountId,
        old_password: &str,
        new_password: &str,
    ) -> Result<AccountView, Error> {
        validate_password(new_password)?;

        let account = self
            .guard
            .update_password(old_password, new_password, account_id)
            .await?;

        let removed = self.sessions.delete_sessions_for_account(account_id).await?;
        tracing::info!(
            account_id = %account_id,
            sessions = removed,
            "Cleared sessions after password change"
        );
        self.events
            .publish(Event::SessionsCleared(account_id.clone()))
            .await;

        Ok(account)
    }

    /// Update nickname, avatar or description. `None` fields are left alone.
    pub async fn update_profile(
        &self,
        account_id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<AccountView, Error> {
        let account = self.accounts.update_profile(account_id, update).await?;
        self.events
            .publish(Event::AccountUpdated(account.clone()))
            .await;
        Ok(account)
    }

    pub async fn get_account(&self, account_id: &AccountId) -> Result<Option<AccountView>, Error> {
        self.accounts.get_by_id(account_id).await
    }

    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountView>, Error> {
        self.accounts.get_by_username(username).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<AccountView>, Error> {
        self.accounts.get_by_email(email).await
    }

    /// Look an account up by username, falling back to email.
    pub async fn find_account(&self, identifier: &str) -> Result<Option<AccountView>, Error> {
        self.accounts.find_by_identifier(identifier).await
    }

    /// Current failed-attempt count and lock state of an account.
    pub async fn lockout_status(&self, account_id: &AccountId) -> Result<LockoutStatus, Error> {
        self.lockout.status(account_id).await
    }

    /// Clear an account's failure counter. Returns whether it was locked.
    pub async fn unlock_account(&self, account_id: &AccountId) -> Result<bool, Error> {
        let was_locked = self.lockout.unlock(account_id).await?;

        if was_locked {
            tracing::info!(account_id = %account_id, "Account unlocked");
            self.events
                .publish(Event::AccountUnlocked {
                    account_id: account_id.clone(),
                    timestamp: self.clock.now(),
                })
                .await;
        }

        Ok(was_locked)
    }

    /// Delete every session that has expired.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, Error> {
        self.sessions.cleanup_expired_sessions().await
    }

    /// Start the background purge of expired failure counters.
    ///
    /// The task stops when `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.lockout.start_cleanup_task(shutdown)
    }
}
