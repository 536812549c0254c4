//! Session management
//!
//! Sessions tie an opaque bearer token to an account after a successful login.
//!
//! | Field        | Type             | Description                                            |
//! | ------------ | ---------------- | ------------------------------------------------------ |
//! | `token`      | `SessionToken`   | Opaque random token handed to the client.              |
//! | `account_id` | `AccountId`      | The account the session belongs to.                    |
//! | `user_agent` | `Option<String>` | The user agent of the client that created the session. |
//! | `ip_address` | `Option<String>` | The IP address of the client that created the session. |
//! | `created_at` | `DateTime`       | The timestamp when the session was created.            |
//! | `updated_at` | `DateTime`       | The timestamp when the session was last updated.       |
//! | `expires_at` | `DateTime`       | The timestamp when the session will expire.            |
//!
//! Storage backends only ever see the SHA256 hash of the token.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::AccountId,
    crypto::{generate_secure_token, hash_token},
    error::utilities::RequiredFieldExt,
};

/// Opaque session token with 256 bits of entropy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    pub fn new_random() -> Self {
        SessionToken(generate_secure_token())
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value persisted in place of the token.
    pub fn hash(&self) -> String {
        hash_token(&self.0)
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub account_id: AccountId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Expired once `now` is past `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    token: Option<SessionToken>,
    account_id: Option<AccountId>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: Option<DateTime<Utc>>,
    expires_in: Option<Duration>,
}

impl SessionBuilder {
    pub fn token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    pub fn build(self) -> Result<Session, Error> {
        let now = self.created_at.unwrap_or_else(Utc::now);
        Ok(Session {
            token: self.token.unwrap_or_default(),
            account_id: self.account_id.require_field("Account ID")?,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            created_at: now,
            updated_at: now,
            expires_at: now + self.expires_in.unwrap_or(Duration::days(30)),
        })
    }
}

/// Per-request capability that records which account a request is
/// authenticated as.
///
/// The account guard calls [`SessionSink::bind`] exactly once, after a
/// successful credential check. What "binding" means is up to the caller: a
/// web integration would write to its own session store, the facade creates a
/// [`Session`].
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn bind(&self, account_id: &AccountId) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_random() {
        let token = SessionToken::new_random();
        assert_eq!(token.as_str().len(), 43);
        assert_ne!(token, SessionToken::new_random());
        assert_eq!(token.hash(), hash_token(token.as_str()));
        assert_ne!(token.hash(), token.as_str());
    }

    #[test]
    fn test_session_builder() {
        let now = Utc::now();
        let session = Session::builder()
            .account_id(AccountId::new("acc_test"))
            .created_at(now)
            .expires_in(Duration::hours(1))
            .build()
            .unwrap();

        assert_eq!(session.created_at, now);
        assert_eq!(session.expires_at, now + Duration::hours(1));
        assert!(!session.is_expired_at(now));
        assert!(!session.is_expired_at(now + Duration::hours(1)));
        assert!(session.is_expired_at(now + Duration::hours(1) + Duration::seconds(1)));
    }

    #[test]
    fn test_session_builder_requires_account() {
        assert!(Session::builder().build().is_err());
    }
}
