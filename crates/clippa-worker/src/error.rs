//! Worker error types.

use thiserror::Error;

use clippa_db::DbError;
use clippa_media::MediaError;
use clippa_models::RequestError;
use clippa_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Message stored on a job that was aborted by its cancellation signal.
pub const TIMEOUT_MESSAGE: &str = "Processing timed out";

/// Pipeline failures. All of them end the job in `error`.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job store error: {0}")]
    Db(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// True for the distinguished cancellation outcome.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Media(MediaError::Aborted))
    }

    /// Text persisted in the job's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            _ if self.is_aborted() => TIMEOUT_MESSAGE.to_string(),
            Self::Media(e) => e.to_string(),
            Self::Storage(e) => e.to_string(),
            Self::Db(e) => e.to_string(),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Reasons a submission is refused before any background work starts.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] RequestError),

    #[error("Failed to create job: {0}")]
    Store(#[from] DbError),
}
