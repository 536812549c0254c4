//! Accounts
//!
//! An account is identified by an opaque [`AccountId`] and two unique human
//! identifiers, the username and the email address. Either may be used to log
//! in.
//!
//! | Field           | Type               | Description                                  |
//! | --------------- | ------------------ | -------------------------------------------- |
//! | `id`            | `AccountId`        | Stable opaque identifier (`acc_...`).        |
//! | `username`      | `String`           | Unique login name.                           |
//! | `email`         | `String`           | Unique email address.                        |
//! | `nickname`      | `Option<String>`   | Display name.                                |
//! | `avatar`        | `Option<String>`   | Avatar URL.                                  |
//! | `description`   | `Option<String>`   | Free-form profile text.                      |
//! | `password_hash` | `String`           | Credential hash. Never leaves the crate API. |
//! | `created_at`    | `DateTime`         | Creation timestamp.                          |
//! | `updated_at`    | `DateTime`         | Last modification timestamp.                 |
//!
//! [`Account`] carries the credential hash and is what repositories return.
//! Everything handed back to callers of the services is an [`AccountView`],
//! which omits it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::utilities::RequiredFieldExt,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// A unique, stable identifier for a specific account
/// This value should be treated as opaque
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Self {
        AccountId(generate_prefixed_id("acc"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the correct format for an account ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "acc")
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored account, including its credential hash.
#[derive(Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The redacted representation handed to callers.
    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }

    /// Apply a profile update in place. Fields left as `None` are unchanged.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(nickname) = &update.nickname {
            self.nickname = Some(nickname.clone());
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = Some(avatar.clone());
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("avatar", &self.avatar)
            .field("description", &self.description)
            .field("password_hash", &"[redacted]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// An account with the credential hash removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        AccountView {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            nickname: account.nickname.clone(),
            avatar: account.avatar.clone(),
            description: account.description.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        AccountView {
            id: account.id,
            username: account.username,
            email: account.email,
            nickname: account.nickname,
            avatar: account.avatar,
            description: account.description,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Parameters for creating an account. The secret is passed separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
}

impl NewAccount {
    pub fn builder() -> NewAccountBuilder {
        NewAccountBuilder::default()
    }

    /// Materialize the stored account once the secret has been hashed.
    pub fn into_account(self, password_hash: String, now: DateTime<Utc>) -> Account {
        Account {
            id: self.id,
            username: self.username,
            email: self.email,
            nickname: self.nickname,
            avatar: self.avatar,
            description: self.description,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Default)]
pub struct NewAccountBuilder {
    id: Option<AccountId>,
    username: Option<String>,
    email: Option<String>,
    nickname: Option<String>,
    avatar: Option<String>,
    description: Option<String>,
}

impl NewAccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Result<NewAccount, Error> {
        Ok(NewAccount {
            id: self.id.unwrap_or_default(),
            username: self.username.require_field("Username")?,
            email: self.email.require_field("Email")?,
            nickname: self.nickname,
            avatar: self.avatar,
            description: self.description,
        })
    }
}

/// Mutable profile fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn sample_account() -> Account {
        NewAccount::builder()
            .username("alice")
            .email("alice@example.com")
            .nickname("Alice")
            .build()
            .unwrap()
            .into_account("$argon2id$v=19$fake".to_string(), Utc::now())
    }

    #[test]
    fn test_account_id() {
        let account_id = AccountId::new("test");
        assert_eq!(account_id.as_str(), "test");
        assert_eq!(AccountId::from("test"), account_id);
        assert!(!account_id.is_valid());

        let random = AccountId::new_random();
        assert!(random.as_str().starts_with("acc_"));
        assert!(random.is_valid());
        assert_ne!(random, AccountId::new_random());
    }

    #[test]
    fn test_builder_requires_username_and_email() {
        let err = NewAccount::builder()
            .email("alice@example.com")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingField(ref msg)) if msg == "Username is required"
        ));

        let err = NewAccount::builder().username("alice").build().unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingField(ref msg)) if msg == "Email is required"
        ));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let account = sample_account();
        let rendered = format!("{account:?}");
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("argon2"));
    }

    #[test]
    fn test_view_omits_hash() {
        let account = sample_account();
        let view = account.view();
        assert_eq!(view.username, "alice");
        assert_eq!(view.nickname.as_deref(), Some("Alice"));

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_apply_profile_update() {
        let mut account = sample_account();
        account.apply(&ProfileUpdate {
            nickname: None,
            avatar: Some("https://example.com/a.png".to_string()),
            description: Some("writer".to_string()),
        });

        assert_eq!(account.nickname.as_deref(), Some("Alice"));
        assert_eq!(account.avatar.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(account.description.as_deref(), Some("writer"));
    }
}
