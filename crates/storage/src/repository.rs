use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prep_core::model::{LearnerId, ProgressRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Optimistic concurrency check failed: someone else wrote first.
    #[error("conflict: expected version {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A progress record together with its storage bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgress {
    pub record: ProgressRecord,
    /// Starts at 1 on first save and increments on every write.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Repository contract for per-learner progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the stored progress for a learner, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or the stored
    /// data cannot be decoded.
    async fn load_progress(&self, learner: &LearnerId)
    -> Result<Option<StoredProgress>, StorageError>;

    /// Write `record` if the stored version still equals `expected_version`.
    ///
    /// `expected_version == 0` means "no record exists yet". Returns the new
    /// version on success.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the stored version differs, or
    /// other storage errors.
    async fn save_progress(
        &self,
        learner: &LearnerId,
        record: &ProgressRecord,
        expected_version: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Remove a learner's progress. Returns whether anything was deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_progress(&self, learner: &LearnerId) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LearnerId, StoredProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(
        &self,
        learner: &LearnerId,
    ) -> Result<Option<StoredProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(learner).cloned())
    }

    async fn save_progress(
        &self,
        learner: &LearnerId,
        record: &ProgressRecord,
        expected_version: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let found = guard.get(learner).map_or(0, |stored| stored.version);
        if found != expected_version {
            return Err(StorageError::Conflict {
                expected: expected_version,
                found,
            });
        }

        let version = found + 1;
        guard.insert(
            learner.clone(),
            StoredProgress {
                record: record.clone(),
                version,
                updated_at,
            },
        );
        Ok(version)
    }

    async fn delete_progress(&self, learner: &LearnerId) -> Result<bool, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(learner).is_some())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
