//! Repository trait for login failure counters.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{Error, storage::FailureCounter};

/// Key/value counter store with per-key expiry.
///
/// Implementations return counters as stored, expired or not; callers decide
/// what an expired counter means. The one exception is [`increment`], which
/// must treat an expired counter as absent.
///
/// [`increment`]: FailureCounterRepository::increment
#[async_trait]
pub trait FailureCounterRepository: Send + Sync + 'static {
    /// Read a counter.
    async fn get(&self, key: &str) -> Result<Option<FailureCounter>, Error>;

    /// Overwrite a counter with `count` and a window of `ttl` starting at `now`.
    async fn set_with_ttl(
        &self,
        key: &str,
        count: u32,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error>;

    /// Atomically add one to a counter.
    ///
    /// If the counter is absent or expired at `now` it is (re)created with a
    /// count of 1 and `expires_at = now + ttl`. Otherwise the count goes up by
    /// one and the window is left as it is. Concurrent increments on the same
    /// key must never be lost.
    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error>;

    /// Delete a counter. Returns whether one existed.
    async fn clear(&self, key: &str) -> Result<bool, Error>;

    /// Delete every counter expired at `now`. Returns the number deleted.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
