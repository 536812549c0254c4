//! SQLite storage backend for bastion
//!
//! Implements the repository traits from `bastion-core` on top of a
//! [`sqlx::SqlitePool`]. Account and session timestamps are stored as unix
//! seconds. Login failure counters use unix milliseconds so a lock never lifts
//! before its `expires_at`.
//!
//! ```rust,no_run
//! use bastion_core::RepositoryProvider;
//! use bastion_storage_sqlite::SqliteRepositoryProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repositories = SqliteRepositoryProvider::connect("sqlite://bastion.db").await?;
//! repositories.migrate().await?;
//! # Ok(())
//! # }
//! ```
use chrono::{DateTime, Utc};

pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAccountRepository, SqliteFailureCounterRepository, SqliteRepositoryProvider,
    SqliteSessionRepository,
};

/// Convert a stored unix timestamp. Out-of-range values read as the epoch.
pub(crate) fn from_unix(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

pub(crate) fn from_unix_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Unix milliseconds rounded up, for deadlines that must not move earlier.
pub(crate) fn ceil_millis(at: DateTime<Utc>) -> i64 {
    let millis = at.timestamp_millis();
    if at.timestamp_subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis + 1
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicU32, Ordering},
    };

    use bastion_core::RepositoryProvider;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use crate::SqliteRepositoryProvider;

    /// A database file removed on drop, for tests that need several connections.
    pub struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        pub fn new() -> Self {
            static NEXT: AtomicU32 = AtomicU32::new(0);
            let path = std::env::temp_dir().join(format!(
                "bastion-test-{}-{}.db",
                std::process::id(),
                NEXT.fetch_add(1, Ordering::Relaxed)
            ));
            Self { path }
        }

        pub async fn provider(&self, max_connections: u32) -> SqliteRepositoryProvider {
            let options = SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await
                .expect("Failed to create pool");
            let provider = SqliteRepositoryProvider::new(pool);
            provider.migrate().await.expect("Failed to migrate");
            provider
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = self.path.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }

    pub async fn setup_provider() -> SqliteRepositoryProvider {
        let _ = tracing_subscriber::fmt().try_init();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        let provider = SqliteRepositoryProvider::new(pool);
        provider.migrate().await.expect("Failed to migrate");
        provider
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn test_ceil_millis() {
        let whole = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
        assert_eq!(ceil_millis(whole), 1_700_000_000_900);
        assert_eq!(from_unix_millis(ceil_millis(whole)), whole);

        let fraction = whole + Duration::nanoseconds(1);
        assert_eq!(ceil_millis(fraction), 1_700_000_000_901);
        assert!(from_unix_millis(ceil_millis(fraction)) >= fraction);
    }
}
