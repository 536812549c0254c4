use std::sync::Arc;

use crate::{
    Account, AccountId, AccountView, Clock, Error, ProfileUpdate,
    error::AuthError,
    repositories::AccountRepository,
    validation::validate_nickname,
};

/// Resolve a login identifier: username first, then email.
pub(crate) async fn resolve_identifier<A: AccountRepository>(
    repository: &A,
    identifier: &str,
) -> Result<Option<Account>, Error> {
    if let Some(account) = repository.find_by_username(identifier).await? {
        return Ok(Some(account));
    }
    repository.find_by_email(identifier).await
}

/// Service for account lookups and profile maintenance
///
/// Everything returned from here is an [`AccountView`]; credential hashes stay
/// inside the repository and the account guard.
pub struct AccountService<A: AccountRepository> {
    repository: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<A: AccountRepository> AccountService<A> {
    pub fn new(repository: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn get_by_id(&self, id: &AccountId) -> Result<Option<AccountView>, Error> {
        Ok(self.repository.find_by_id(id).await?.map(AccountView::from))
    }

    pub async fn get_by_id_or_err(&self, id: &AccountId) -> Result<AccountView, Error> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound.into())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<AccountView>, Error> {
        Ok(self
            .repository
            .find_by_username(username)
            .await?
            .map(AccountView::from))
    }

    pub async fn get_by_username_or_err(&self, username: &str) -> Result<AccountView, Error> {
        self.get_by_username(username)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound.into())
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<AccountView>, Error> {
        Ok(self
            .repository
            .find_by_email(email)
            .await?
            .map(AccountView::from))
    }

    pub async fn get_by_email_or_err(&self, email: &str) -> Result<AccountView, Error> {
        self.get_by_email(email)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound.into())
    }

    /// Look an account up the way login does: by username, else by email.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountView>, Error> {
        Ok(resolve_identifier(self.repository.as_ref(), identifier)
            .await?
            .map(AccountView::from))
    }

    /// Apply a profile update. Fields left as `None` are unchanged.
    pub async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<AccountView, Error> {
        validate_nickname(update.nickname.as_deref())?;

        let mut account = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        account.apply(update);
        account.updated_at = self.clock.now();

        let updated = self.repository.update(&account).await?;
        tracing::debug!(account_id = %id, "Updated account profile");
        Ok(updated.into())
    }
}
