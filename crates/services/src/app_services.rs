use std::sync::Arc;

use prep_core::model::{LearnerId, ProgressSummary};
use storage::repository::Storage;

use crate::Clock;
use crate::banks::QuestionBank;
use crate::error::{AppServicesError, ProgressStoreError};
use crate::practice::PracticeLoopService;
use crate::progress_store::ProgressStore;

/// Assembles app-facing services over one storage backend and question bank.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressStore>,
    practice: Arc<PracticeLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        bank: Arc<dyn QuestionBank>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, bank))
    }

    /// Build services over in-memory storage; nothing outlives the process.
    #[must_use]
    pub fn in_memory(clock: Clock, bank: Arc<dyn QuestionBank>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, bank)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, bank: Arc<dyn QuestionBank>) -> Self {
        let progress = Arc::new(ProgressStore::new(clock, Arc::clone(&storage.progress)));
        let practice = Arc::new(PracticeLoopService::new(bank, Arc::clone(&progress)));
        Self { progress, practice }
    }

    #[must_use]
    pub fn progress_store(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn practice_loop(&self) -> Arc<PracticeLoopService> {
        Arc::clone(&self.practice)
    }

    /// Dashboard view of a learner's progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the record cannot be loaded.
    pub async fn summary(&self, learner: &LearnerId) -> Result<ProgressSummary, ProgressStoreError> {
        let record = self.progress.get(learner).await?;
        Ok(ProgressSummary::from_record(&record))
    }
}
