#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bastion::{
    AccountView, Bastion, BastionBuilder, CredentialHasher, Error, Event, EventHandler,
    ManualClock, MemoryRepositoryProvider, NewAccount, RepositoryProvider, error::EventError,
};
use chrono::{TimeZone, Utc};

#[cfg(feature = "sqlite")]
use bastion::SqliteRepositoryProvider;
#[cfg(feature = "sqlite")]
use sqlx::sqlite::SqlitePoolOptions;

pub const PASSWORD: &str = "s3cr3t!";

/// Reversible stand-in for Argon2 so tests stay fast
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, raw: &str) -> Result<String, Error> {
        Ok(format!("plain:{raw}"))
    }

    fn verify(&self, raw: &str, digest: &str) -> Result<bool, Error> {
        Ok(digest == format!("plain:{raw}"))
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    names: Mutex<Vec<&'static str>>,
}

impl RecordingHandler {
    pub fn names(&self) -> Vec<&'static str> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
        self.names.lock().unwrap().push(event.name());
        Ok(())
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    manual_clock_at(0)
}

/// A clock starting `nanos` past a whole second, like a real system clock.
pub fn manual_clock_at(nanos: u32) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.timestamp_opt(1_700_000_000, nanos).unwrap(),
    ))
}

pub async fn memory_bastion(clock: Arc<ManualClock>) -> Bastion<MemoryRepositoryProvider> {
    let _ = tracing_subscriber::fmt().try_init();

    BastionBuilder::new()
        .with_memory()
        .with_clock(clock)
        .with_hasher(Arc::new(PlainHasher))
        .build()
        .await
        .expect("Failed to build bastion")
}

#[cfg(feature = "sqlite")]
pub async fn sqlite_bastion(clock: Arc<ManualClock>) -> Bastion<SqliteRepositoryProvider> {
    let _ = tracing_subscriber::fmt().try_init();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    BastionBuilder::new()
        .with_sqlite_pool(pool)
        .with_clock(clock)
        .with_hasher(Arc::new(PlainHasher))
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build bastion")
}

pub fn new_account(username: &str) -> NewAccount {
    NewAccount::builder()
        .username(username)
        .email(format!("{username}@example.com"))
        .build()
        .unwrap()
}

pub async fn create_alice<R: RepositoryProvider>(bastion: &Bastion<R>) -> AccountView {
    bastion
        .create_account(new_account("alice"), PASSWORD)
        .await
        .expect("Failed to create alice")
}
