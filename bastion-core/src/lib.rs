//! Core functionality for the bastion account service
//!
//! This crate contains the account and session types, the error taxonomy, the
//! repository traits storage backends implement, and the services built on top
//! of them.
//!
//! The centrepiece is [`AccountGuard`](services::AccountGuard), which owns the
//! login lockout policy: after [`MAX_LOGIN_TRY`] consecutive failed attempts an
//! account rejects every login, correct secret or not, until [`LOCK_MINUTES`]
//! have passed since the first failure or an administrator clears the counter.
//!
//! Storage backends implement the traits in [`repositories`]. An in-memory
//! backend lives in [`repositories::memory`] and is suitable for tests and
//! single-process deployments.
pub mod account;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod events;
pub mod id;
pub mod repositories;
pub mod services;
pub mod session;
pub mod storage;
pub mod validation;

pub use account::{Account, AccountId, AccountView, NewAccount, ProfileUpdate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{Argon2Hasher, CredentialHasher};
pub use error::{Error, ErrorKind};
pub use events::{Event, EventBus, EventHandler};
pub use repositories::RepositoryProvider;
pub use session::{Session, SessionSink, SessionToken};
pub use storage::{
    FailureCounter, LOCK_MINUTES, LOGIN_FAILURE_COUNT_KEY, LockoutConfig, LockoutStatus,
    MAX_LOGIN_TRY, SessionConfig,
};
