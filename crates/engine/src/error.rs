//! The module contains the error the engine can throw.
//!
//! Every variant is classified into an [`ErrorKind`], which is what callers
//! (the HTTP layer, the admin CLI) map to user-visible behavior:
//!
//! - [`KeyNotFound`] a project/party/transaction is absent or not owned by
//!   the acting user. Both cases produce the same error on purpose.
//! - [`ExistingKey`] a project code or party name collides.
//! - [`KindMismatch`] a party category does not accept the transaction kind.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`KindMismatch`]: EngineError::KindMismatch
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Abstract error classes exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidState,
    Internal,
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Kind mismatch: {0}")]
    KindMismatch(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::InvalidAmount(_) | Self::InvalidId(_) | Self::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            Self::ExistingKey(_) | Self::KindMismatch(_) | Self::InvalidState(_) => {
                ErrorKind::InvalidState
            }
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Maps a unique-index violation to `ExistingKey(key)`. Other database
    /// errors pass through.
    pub(crate) fn on_conflict(key: &str) -> impl FnOnce(DbErr) -> Self + '_ {
        move |err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::ExistingKey(key.to_string()),
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::KindMismatch(a), Self::KindMismatch(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
