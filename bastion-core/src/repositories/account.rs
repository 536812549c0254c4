use crate::{Account, AccountId, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for account data access
///
/// Implementations enforce username and email uniqueness themselves: `create`
/// fails with [`AuthError::AccountAlreadyExists`](crate::error::AuthError)
/// naming the taken field, even when two creations race.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persist a new account
    async fn create(&self, account: Account) -> Result<Account, Error>;

    /// Find an account by ID
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error>;

    /// Find an account by username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error>;

    /// Find an account by email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;

    /// Write back the profile fields and `updated_at` of an existing account
    async fn update(&self, account: &Account) -> Result<Account, Error>;

    /// Replace the stored credential hash
    async fn set_password_hash(
        &self,
        id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error>;
}
