//! Error taxonomy for the pack core.
//!
//! Handlers translate these into user-facing messages through [`CoreError::kind`].
//! Row parsing, migrations and settings still use `anyhow` internally; anything
//! coming out of them is a storage failure.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("caller does not own this pack")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("label {label_id} belongs to a different pack than pack item {pack_item_id}")]
    CrossPackLabel { pack_item_id: i64, label_id: i64 },

    #[error("no unique short id found after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

/// Coarse classification used by callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Conflict,
    InvalidInput,
    ExhaustedRetries,
    StorageFailure,
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Unauthorized => ErrorKind::Unauthorized,
            CoreError::Conflict(_) | CoreError::CrossPackLabel { .. } => ErrorKind::Conflict,
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            CoreError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Server-side failures the caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ExhaustedRetries | ErrorKind::StorageFailure
        )
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(anyhow::Error::new(err))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Storage(err)
    }
}

/// True when a rusqlite error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
