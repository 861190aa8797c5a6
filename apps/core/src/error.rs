use std::io;
use thiserror::Error;

/// Reasons a training corpus is refused at startup.
///
/// Any of these is fatal: an analyzer is never constructed over a corpus that
/// fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// The corpus contains no examples at all.
    #[error("training corpus is empty")]
    EmptyCorpus,

    /// Two examples share the same identifier.
    #[error("duplicate training example id: {0}")]
    DuplicateId(String),

    /// A single example violates a field invariant.
    #[error("invalid training example {id}: {reason}")]
    InvalidField { id: String, reason: String },

    /// The dataset could not be decoded at all (bad JSON, unknown enum value).
    #[error("malformed training corpus: {0}")]
    Malformed(String),
}

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// The training corpus failed validation.
    #[error("Dataset validation error: {0}")]
    Dataset(#[from] DatasetError),

    /// Represents errors originating from the SQLite key-value adapter.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents data validation errors (e.g., malformed feedback).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., unparsable environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The feedback store could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Dataset(e) => AppError::Dataset(e.clone()),
            AppError::Database(e) => AppError::Database(sqlx::Error::Protocol(e.to_string())),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Persistence(s) => AppError::Persistence(s.clone()),
            AppError::Internal(s) => AppError::Internal(s.clone()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}
