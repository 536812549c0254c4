pub mod utilities;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists: {0} is taken")]
    AccountAlreadyExists(String),

    #[error("Account locked until {locked_until}")]
    AccountLocked { locked_until: DateTime<Utc> },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Session already bound")]
    AlreadyBound,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid nickname: {0}")]
    InvalidNickname(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event handler error: {0}")]
    HandlerError(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Coarse classification of an [`Error`] for callers that map outcomes to
/// responses without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidCredentials,
    AccountLocked,
    Conflict,
    Invalid,
    Infrastructure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(AuthError::AccountNotFound) => ErrorKind::NotFound,
            Error::Auth(AuthError::InvalidCredentials) => ErrorKind::InvalidCredentials,
            Error::Auth(AuthError::AccountLocked { .. }) => ErrorKind::AccountLocked,
            Error::Auth(AuthError::AccountAlreadyExists(_)) => ErrorKind::Conflict,
            Error::Validation(_) => ErrorKind::Invalid,
            Error::Session(SessionError::NotFound | SessionError::Expired) => ErrorKind::NotFound,
            Error::Session(SessionError::AlreadyBound)
            | Error::Storage(_)
            | Error::Event(_)
            | Error::Crypto(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::Session(_))
    }

    /// When the error is a lockout, the instant the lock lifts.
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Error::Auth(AuthError::AccountLocked { locked_until }) => Some(*locked_until),
            _ => None,
        }
    }
}
