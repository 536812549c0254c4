use async_trait::async_trait;
use bastion_core::{
    Error, FailureCounter, error::utilities::DatabaseResultExt,
    repositories::FailureCounterRepository,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::{ceil_millis, from_unix_millis};

pub struct SqliteFailureCounterRepository {
    pool: SqlitePool,
}

impl SqliteFailureCounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteFailureCounter {
    key: String,
    count: i64,
    created_at_ms: i64,
    expires_at_ms: i64,
}

impl From<SqliteFailureCounter> for FailureCounter {
    fn from(row: SqliteFailureCounter) -> Self {
        FailureCounter {
            key: row.key,
            count: u32::try_from(row.count).unwrap_or(u32::MAX),
            created_at: from_unix_millis(row.created_at_ms),
            expires_at: from_unix_millis(row.expires_at_ms),
        }
    }
}

#[async_trait]
impl FailureCounterRepository for SqliteFailureCounterRepository {
    async fn get(&self, key: &str) -> Result<Option<FailureCounter>, Error> {
        let row = sqlx::query_as::<_, SqliteFailureCounter>(
            "SELECT key, count, created_at_ms, expires_at_ms FROM login_failure_counters WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to get failure counter")?;

        Ok(row.map(FailureCounter::from))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        count: u32,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error> {
        let row = sqlx::query_as::<_, SqliteFailureCounter>(
            r#"
            INSERT INTO login_failure_counters (key, count, created_at_ms, expires_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                count = excluded.count,
                created_at_ms = excluded.created_at_ms,
                expires_at_ms = excluded.expires_at_ms
            RETURNING key, count, created_at_ms, expires_at_ms
            "#,
        )
        .bind(key)
        .bind(i64::from(count))
        .bind(now.timestamp_millis())
        .bind(ceil_millis(now + ttl))
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to set failure counter")?;

        Ok(row.into())
    }

    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<FailureCounter, Error> {
        // One statement, so concurrent increments serialize on the row.
        let row = sqlx::query_as::<_, SqliteFailureCounter>(
            r#"
            INSERT INTO login_failure_counters (key, count, created_at_ms, expires_at_ms)
            VALUES (?1, 1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                count = CASE
                    WHEN login_failure_counters.expires_at_ms <= excluded.created_at_ms THEN 1
                    ELSE login_failure_counters.count + 1
                END,
                created_at_ms = CASE
                    WHEN login_failure_counters.expires_at_ms <= excluded.created_at_ms THEN excluded.created_at_ms
                    ELSE login_failure_counters.created_at_ms
                END,
                expires_at_ms = CASE
                    WHEN login_failure_counters.expires_at_ms <= excluded.created_at_ms THEN excluded.expires_at_ms
                    ELSE login_failure_counters.expires_at_ms
                END
            RETURNING key, count, created_at_ms, expires_at_ms
            "#,
        )
        .bind(key)
        .bind(now.timestamp_millis())
        .bind(ceil_millis(now + ttl))
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to increment failure counter")?;

        Ok(row.into())
    }

    async fn clear(&self, key: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM login_failure_counters WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_db_err("Failed to clear failure counter")?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_failure_counters WHERE expires_at_ms <= ?1")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to purge failure counters")?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bastion_core::repositories::{FailureCounterRepository, FailureCounterRepositoryProvider};
    use chrono::{Duration, TimeZone, Utc};

    use crate::test_support::{TempDatabase, setup_provider};

    #[tokio::test]
    async fn test_increment_keeps_window() {
        let provider = setup_provider().await;
        let repo = provider.failure_counter();
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let ttl = Duration::minutes(10);

        let first = repo.increment("k", start, ttl).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.expires_at, start + ttl);

        let second = repo
            .increment("k", start + Duration::minutes(4), ttl)
            .await
            .unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.created_at, start);
        assert_eq!(second.expires_at, start + ttl);
    }

    #[tokio::test]
    async fn test_increment_resets_expired_counter() {
        let provider = setup_provider().await;
        let repo = provider.failure_counter();
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let ttl = Duration::minutes(10);

        repo.set_with_ttl("k", 5, start, ttl).await.unwrap();

        let later = start + ttl;
        let counter = repo.increment("k", later, ttl).await.unwrap();
        assert_eq!(counter.count, 1);
        assert_eq!(counter.created_at, later);
        assert_eq!(counter.expires_at, later + ttl);
    }

    #[tokio::test]
    async fn test_get_returns_expired_counter_as_stored() {
        let provider = setup_provider().await;
        let repo = provider.failure_counter();
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        repo.set_with_ttl("k", 3, start, Duration::minutes(1))
            .await
            .unwrap();
        let counter = repo.get("k").await.unwrap().unwrap();
        assert_eq!(counter.count, 3);
        assert!(counter.is_expired(start + Duration::minutes(1)));
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_and_purge() {
        let provider = setup_provider().await;
        let repo = provider.failure_counter();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

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
    async fn test_sub_second_window_is_not_shortened() {
        let provider = setup_provider().await;
        let repo = provider.failure_counter();
        let start = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
        let ttl = Duration::minutes(10);

        let counter = repo.increment("k", start, ttl).await.unwrap();
        assert_eq!(counter.created_at, start);
        assert_eq!(counter.expires_at, start + ttl);

        let stored = repo.get("k").await.unwrap().unwrap();
        assert!(!stored.is_expired(start + ttl - Duration::milliseconds(500)));
        assert!(stored.is_expired(start + ttl));

        let purged = repo
            .purge_expired(start + ttl - Duration::milliseconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 0);

        // Nanosecond clocks round the deadline up, never down.
        let precise = start + Duration::nanoseconds(1_234);
        let counter = repo.increment("p", precise, ttl).await.unwrap();
        assert!(counter.expires_at >= precise + ttl);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let database = TempDatabase::new();
        let provider = Arc::new(database.provider(8).await);
        let now = Utc::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move {
                    provider
                        .failure_counter()
                        .increment("k", now, Duration::minutes(10))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let counter = provider.failure_counter().get("k").await.unwrap().unwrap();
        assert_eq!(counter.count, 32);
    }
}
