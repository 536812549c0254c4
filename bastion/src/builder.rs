//! Builder pattern for constructing Bastion instances
//!
//! This module provides a type-safe builder for creating [`Bastion`] instances with
//! compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use bastion::{BastionBuilder, LockoutConfig};
//! use chrono::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // SQLite with auto-migration
//!     let bastion = BastionBuilder::new()
//!         .with_sqlite("sqlite://bastion.db")
//!         .await?
//!         .with_lockout_config(LockoutConfig::default().with_max_login_tries(3))
//!         .with_session_expiry(Duration::days(7))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     // In-memory storage needs no migrations
//!     let scratch = BastionBuilder::new().with_memory().build().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use bastion_core::{
    Argon2Hasher, Clock, CredentialHasher, LockoutConfig, RepositoryProvider, SessionConfig,
    SystemClock, repositories::MemoryRepositoryProvider,
};
use chrono::Duration;

use crate::Bastion;

/// Errors that can occur when building a Bastion instance.
#[derive(Debug, thiserror::Error)]
pub enum BastionBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`BastionBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Bastion`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build or add more configuration
pub struct BastionBuilder<Storage> {
    storage: Storage,
    lockout_config: LockoutConfig,
    session_config: SessionConfig,
    clock: Arc<dyn Clock>,
    hasher: Arc<dyn CredentialHasher>,
    apply_migrations: bool,
}

impl Default for BastionBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl BastionBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout: enabled, 5 attempts, 10 minute lock
    /// - Session expiry: 30 days
    /// - Clock: system time
    /// - Password hashing: Argon2
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            lockout_config: LockoutConfig::default(),
            session_config: SessionConfig::default(),
            clock: Arc::new(SystemClock),
            hasher: Arc::new(Argon2Hasher),
            apply_migrations: false,
        }
    }

    /// Use an existing repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> BastionBuilder<WithStorage<R>> {
        BastionBuilder {
            storage: WithStorage { repositories },
            lockout_config: self.lockout_config,
            session_config: self.session_config,
            clock: self.clock,
            hasher: self.hasher,
            apply_migrations: self.apply_migrations,
        }
    }

    /// Keep everything in process memory. Data is lost on drop.
    pub fn with_memory(self) -> BastionBuilder<WithStorage<MemoryRepositoryProvider>> {
        self.with_repositories(Arc::new(MemoryRepositoryProvider::new()))
    }
}

#[cfg(feature = "sqlite")]
impl BastionBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<BastionBuilder<WithStorage<crate::SqliteRepositoryProvider>>, BastionBuilderError>
    {
        let repositories = crate::SqliteRepositoryProvider::connect(url)
            .await
            .map_err(|e| BastionBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(repositories)))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> BastionBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

impl<R: RepositoryProvider> BastionBuilder<WithStorage<R>> {
    /// Replace the login lockout policy.
    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Set how long new sessions stay valid.
    pub fn with_session_expiry(mut self, duration: Duration) -> Self {
        self.session_config.expires_in = duration;
        self
    }

    /// Use another time source, such as a [`ManualClock`](crate::ManualClock) in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use another password hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Run storage migrations during [`build`](Self::build).
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Build the Bastion instance.
    ///
    /// # Errors
    ///
    /// - [`BastionBuilderError::InvalidConfiguration`] if the lockout threshold
    ///   or the cleanup interval is zero, or the lock duration or session
    ///   expiry is not positive
    /// - [`BastionBuilderError::Migration`] if migrations were requested and failed
    pub async fn build(self) -> Result<Bastion<R>, BastionBuilderError> {
        if self.lockout_config.enabled {
            if self.lockout_config.max_login_tries == 0 {
                return Err(BastionBuilderError::InvalidConfiguration(
                    "max_login_tries must be at least 1".to_string(),
                ));
            }
            if self.lockout_config.lock_duration <= Duration::zero() {
                return Err(BastionBuilderError::InvalidConfiguration(
                    "lock_duration must be positive".to_string(),
                ));
            }
        }
        if self.lockout_config.cleanup_interval.is_zero() {
            return Err(BastionBuilderError::InvalidConfiguration(
                "cleanup_interval must be positive".to_string(),
            ));
        }
        if self.session_config.expires_in <= Duration::zero() {
            return Err(BastionBuilderError::InvalidConfiguration(
                "session expiry must be positive".to_string(),
            ));
        }

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| BastionBuilderError::Migration(e.to_string()))?;
        }

        tracing::debug!(
            lockout_enabled = self.lockout_config.enabled,
            max_login_tries = self.lockout_config.max_login_tries,
            "Built bastion"
        );

        Ok(Bastion::from_parts(
            self.storage.repositories,
            self.lockout_config,
            self.session_config,
            self.clock,
            self.hasher,
        ))
    }
}
