//! Repository implementations for SQLite storage

pub mod account;
pub mod failure_counter;
pub mod session;

pub use account::SqliteAccountRepository;
pub use failure_counter::SqliteFailureCounterRepository;
pub use session::SqliteSessionRepository;

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use bastion_core::{
    Error,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::{
        AccountRepositoryProvider, FailureCounterRepositoryProvider, RepositoryProvider,
        SessionRepositoryProvider,
    },
};
use bastion_migration::MigrationManager;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    account: Arc<SqliteAccountRepository>,
    failure_counter: Arc<SqliteFailureCounterRepository>,
    session: Arc<SqliteSessionRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let account = Arc::new(SqliteAccountRepository::new(pool.clone()));
        let failure_counter = Arc::new(SqliteFailureCounterRepository::new(pool.clone()));
        let session = Arc::new(SqliteSessionRepository::new(pool.clone()));

        Self {
            pool,
            account,
            failure_counter,
            session,
        }
    }

    /// Open a pool for `database_url`, creating the database file if needed.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                Error::Storage(StorageError::Connection(e.to_string()))
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AccountRepositoryProvider for SqliteRepositoryProvider {
    type AccountRepo = SqliteAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.account
    }
}

impl FailureCounterRepositoryProvider for SqliteRepositoryProvider {
    type FailureCounterRepo = SqliteFailureCounterRepository;

    fn failure_counter(&self) -> &Self::FailureCounterRepo {
        &self.failure_counter
    }
}

impl SessionRepositoryProvider for SqliteRepositoryProvider {
    type SessionRepo = SqliteSessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_db_err("Health check failed")?;
        Ok(())
    }
}
