//! The account guard: credential checks wrapped in the lockout policy.
//!
//! # Login
//!
//! 1. Resolve the identifier, as a username first and then as an email.
//! 2. If the account is locked, fail with `AccountLocked` without looking at
//!    the secret.
//! 3. Verify the secret. A mismatch counts one failure and fails with
//!    `InvalidCredentials`.
//! 4. A match binds the account into the caller's [`SessionSink`], then clears
//!    the failure counter and returns the redacted account. A sink that fails
//!    leaves the counter as it was.
//!
//! Password updates and account creation also live here. Neither touches the
//! failure counter.

use std::sync::Arc;

use crate::{
    AccountId, AccountView, Clock, CredentialHasher, Error, NewAccount,
    error::{AuthError, CryptoError, utilities::require_non_empty},
    events::{Event, EventBus},
    repositories::{AccountRepository, FailureCounterRepository},
    services::{account::resolve_identifier, lockout::LoginLockoutService},
    session::SessionSink,
    storage::LockoutStatus,
};

pub struct AccountGuard<A: AccountRepository, C: FailureCounterRepository> {
    accounts: Arc<A>,
    lockout: Arc<LoginLockoutService<C>>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl<A: AccountRepository, C: FailureCounterRepository> AccountGuard<A, C> {
    pub fn new(
        accounts: Arc<A>,
        lockout: Arc<LoginLockoutService<C>>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            accounts,
            lockout,
            hasher,
            clock,
            events,
        }
    }

    pub fn lockout(&self) -> &LoginLockoutService<C> {
        &self.lockout
    }

    /// Check a secret for the account named by `identifier` and, on success,
    /// bind that account into `sink`.
    ///
    /// # Errors
    ///
    /// - `Validation(MissingField)` if either argument is empty
    /// - `Auth(AccountNotFound)` if no username or email matches
    /// - `Auth(AccountLocked)` while the account is locked, whatever the secret
    /// - `Auth(InvalidCredentials)` if the secret does not match
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
        sink: &dyn SessionSink,
    ) -> Result<AccountView, Error> {
        require_non_empty(identifier, "Identifier")?;
        require_non_empty(secret, "Password")?;

        let account = resolve_identifier(self.accounts.as_ref(), identifier)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let status = self.lockout.status(&account.id).await?;
        if let Some(locked_until) = status.locked_until.filter(|_| status.is_locked) {
            tracing::warn!(
                account_id = %account.id,
                failed_attempts = status.failed_attempts,
                locked_until = %locked_until,
                "Login rejected for locked account"
            );
            return Err(AuthError::AccountLocked { locked_until }.into());
        }

        if !self.verify_secret(secret, &account.password_hash).await? {
            let status = self.record_failure(&account.id).await?;
            tracing::info!(
                account_id = %account.id,
                failed_attempts = status.failed_attempts,
                "Login failed"
            );
            return Err(AuthError::InvalidCredentials.into());
        }

        sink.bind(&account.id).await?;
        self.record_success(&account.id).await?;

        self.events
            .publish(Event::LoginSucceeded {
                account_id: account.id.clone(),
                timestamp: self.clock.now(),
            })
            .await;
        tracing::info!(account_id = %account.id, "Login succeeded");

        Ok(account.into())
    }

    /// Count a failed attempt against an account.
    pub async fn record_failure(&self, account_id: &AccountId) -> Result<LockoutStatus, Error> {
        let status = self.lockout.record_failure(account_id).await?;
        let now = self.clock.now();

        self.events
            .publish(Event::LoginFailed {
                account_id: account_id.clone(),
                failed_attempts: status.failed_attempts,
                timestamp: now,
            })
            .await;

        let threshold = self.lockout.config().max_login_tries;
        let just_locked = status.is_locked && status.failed_attempts == threshold;
        if let Some(locked_until) = status.locked_until.filter(|_| just_locked) {
            tracing::warn!(
                account_id = %account_id,
                failed_attempts = status.failed_attempts,
                locked_until = %locked_until,
                "Account locked after repeated login failures"
            );
            self.events
                .publish(Event::AccountLocked {
                    account_id: account_id.clone(),
                    failed_attempts: status.failed_attempts,
                    locked_until,
                    timestamp: now,
                })
                .await;
        }

        Ok(status)
    }

    /// Reset the failure count of an account after a successful login.
    pub async fn record_success(&self, account_id: &AccountId) -> Result<(), Error> {
        self.lockout.record_success(account_id).await
    }

    /// Replace an account's secret after checking the current one.
    ///
    /// A wrong `old_secret` fails with `InvalidCredentials` but is not counted
    /// as a login failure.
    pub async fn update_password(
        &self,
        old_secret: &str,
        new_secret: &str,
        account_id: &AccountId,
    ) -> Result<AccountView, Error> {
        require_non_empty(old_secret, "Old password")?;
        require_non_empty(new_secret, "New password")?;
        require_non_empty(account_id.as_str(), "Account ID")?;

        let mut account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !self.verify_secret(old_secret, &account.password_hash).await? {
            tracing::info!(account_id = %account_id, "Password update rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        let password_hash = self.hash_secret(new_secret).await?;
        let now = self.clock.now();
        self.accounts
            .set_password_hash(account_id, &password_hash, now)
            .await?;

        account.password_hash = password_hash;
        account.updated_at = now;

        self.events
            .publish(Event::PasswordUpdated {
                account_id: account_id.clone(),
                timestamp: now,
            })
            .await;
        tracing::info!(account_id = %account_id, "Password updated");

        Ok(account.into())
    }

    /// Create an account holding the hash of `raw_secret`.
    ///
    /// Field validation is the caller's job. Fails with
    /// `AccountAlreadyExists` naming the taken field when the username or
    /// email is in use; nothing is written in that case.
    pub async fn create_account(
        &self,
        params: NewAccount,
        raw_secret: &str,
    ) -> Result<AccountView, Error> {
        require_non_empty(raw_secret, "Password")?;

        if self
            .accounts
            .find_by_username(&params.username)
            .await?
            .is_some()
        {
            return Err(AuthError::AccountAlreadyExists("username".to_string()).into());
        }
        if self.accounts.find_by_email(&params.email).await?.is_some() {
            return Err(AuthError::AccountAlreadyExists("email".to_string()).into());
        }

        let password_hash = self.hash_secret(raw_secret).await?;
        let account = self
            .accounts
            .create(params.into_account(password_hash, self.clock.now()))
            .await?;
        let view = AccountView::from(account);

        self.events
            .publish(Event::AccountCreated(view.clone()))
            .await;
        tracing::info!(account_id = %view.id, username = %view.username, "Account created");

        Ok(view)
    }

    async fn hash_secret(&self, raw: &str) -> Result<String, Error> {
        let hasher = Arc::clone(&self.hasher);
        let raw = raw.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&raw))
            .await
            .map_err(|e| CryptoError::PasswordHash(format!("hashing task failed: {e}")))?
    }

    async fn verify_secret(&self, raw: &str, digest: &str) -> Result<bool, Error> {
        let hasher = Arc::clone(&self.hasher);
        let raw = raw.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&raw, &digest))
            .await
            .map_err(|e| CryptoError::PasswordHash(format!("verification task failed: {e}")))?
    }
}
