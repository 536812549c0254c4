//! Storage seams for accounts, login failure counters and sessions.
//!
//! A backend implements the three `*Repository` traits, exposes each one through
//! its `*RepositoryProvider` trait and adds `migrate`/`health_check` via
//! [`RepositoryProvider`]. Services never see the provider directly; they take
//! the `*RepositoryAdapter` wrappers from [`adapter`].

pub mod account;
pub mod adapter;
pub mod failure_counter;
pub mod memory;
pub mod session;

pub use account::AccountRepository;
pub use adapter::{
    AccountRepositoryAdapter, FailureCounterRepositoryAdapter, SessionRepositoryAdapter,
};
pub use failure_counter::FailureCounterRepository;
pub use memory::MemoryRepositoryProvider;
pub use session::SessionRepository;

use async_trait::async_trait;

use crate::Error;

pub trait AccountRepositoryProvider: Send + Sync + 'static {
    type AccountRepo: AccountRepository;

    fn account(&self) -> &Self::AccountRepo;
}

pub trait FailureCounterRepositoryProvider: Send + Sync + 'static {
    type FailureCounterRepo: FailureCounterRepository;

    fn failure_counter(&self) -> &Self::FailureCounterRepo;
}

pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn session(&self) -> &Self::SessionRepo;
}

/// Everything a storage backend has to offer the account services.
///
/// See [`MemoryRepositoryProvider`] for a complete implementation that keeps
/// all state in `DashMap`s.
#[async_trait]
pub trait RepositoryProvider:
    AccountRepositoryProvider + FailureCounterRepositoryProvider + SessionRepositoryProvider
{
    /// Create or upgrade the backing schema. Safe to call repeatedly.
    async fn migrate(&self) -> Result<(), Error>;

    /// Fail if the backend cannot serve queries.
    async fn health_check(&self) -> Result<(), Error>;
}
