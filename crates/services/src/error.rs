//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use prep_core::EmptyPoolError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by question-bank providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("failed to read question bank {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question bank request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("no questions match the selected filters")]
    Empty,
}

/// Errors emitted by the practice session loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("no questions available for practice")]
    Empty,
    #[error("practice session already completed")]
    Completed,
    #[error("no question is waiting for an answer")]
    NoCurrentQuestion,
    #[error("current question was already answered")]
    AlreadyAnswered,
    #[error("choice {choice} is out of range for {len} choices")]
    InvalidChoice { choice: usize, len: usize },
    #[error(transparent)]
    Bank(#[from] QuestionBankError),
    #[error(transparent)]
    Progress(#[from] ProgressStoreError),
}

impl From<EmptyPoolError> for PracticeError {
    fn from(_: EmptyPoolError) -> Self {
        Self::Empty
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
