//! Lockout bookkeeping types and service configuration
//!
//! The failure counter is the only piece of shared mutable state in the login
//! path. It lives in a key/value style store keyed by
//! `login.failure.count:<account id>` and carries its own expiry, so a counter
//! that is never cleared simply stops counting once its window has passed.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Consecutive failures after which an account is locked.
pub const MAX_LOGIN_TRY: u32 = 5;

/// Length of the lockout window, measured from the first failure.
pub const LOCK_MINUTES: i64 = 10;

/// Key prefix for failure counters in the counter store.
pub const LOGIN_FAILURE_COUNT_KEY: &str = "login.failure.count";

/// Counter store key for an account.
pub fn failure_counter_key(account_id: &AccountId) -> String {
    format!("{LOGIN_FAILURE_COUNT_KEY}:{account_id}")
}

/// A failed-login counter with its window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCounter {
    pub key: String,
    pub count: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FailureCounter {
    /// A fresh counter holding a single failure.
    pub fn first(key: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            count: 1,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }
}

/// Configuration for the login lockout policy.
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// When disabled, no counter is read or written and nothing is ever locked.
    pub enabled: bool,
    pub max_login_tries: u32,
    pub lock_duration: Duration,
    /// How often the background task purges expired counters.
    pub cleanup_interval: std::time::Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_login_tries: MAX_LOGIN_TRY,
            lock_duration: Duration::minutes(LOCK_MINUTES),
            cleanup_interval: std::time::Duration::from_secs(3600),
        }
    }
}

impl LockoutConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_max_login_tries(mut self, max_login_tries: u32) -> Self {
        self.max_login_tries = max_login_tries;
        self
    }

    pub fn with_lock_duration(mut self, lock_duration: Duration) -> Self {
        self.lock_duration = lock_duration;
        self
    }

    pub fn with_cleanup_interval(mut self, cleanup_interval: std::time::Duration) -> Self {
        self.cleanup_interval = cleanup_interval;
        self
    }
}

/// Configuration for sessions created at login.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub expires_in: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expires_in: Duration::days(30),
        }
    }
}

/// Lockout state of an account at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutStatus {
    pub account_id: AccountId,
    /// Failures counted in the active window, zero when there is none.
    pub failed_attempts: u32,
    pub is_locked: bool,
    /// Set only while locked.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    pub fn unlocked(account_id: &AccountId) -> Self {
        Self {
            account_id: account_id.clone(),
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
        }
    }

    /// Seconds until the lock lifts, for `Retry-After` style responses.
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.locked_until
            .filter(|_| self.is_locked)
            .map(|until| (until - now).num_seconds().max(0))
    }
}
