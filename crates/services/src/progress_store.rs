use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use prep_core::model::{AnswerEffect, LearnerId, ProgressRecord, Question};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::ProgressStoreError;

/// Everything produced by persisting one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerReceipt {
    pub record: ProgressRecord,
    pub effect: AnswerEffect,
    /// Storage version written for this answer.
    pub version: u64,
}

/// Owns each learner's cumulative progress.
///
/// Writes for one learner are serialized through a per-learner async mutex;
/// the repository's version check catches writers outside this process.
pub struct ProgressStore {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    locks: Mutex<HashMap<LearnerId, Arc<Mutex<()>>>>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn learner_lock(&self, learner: &LearnerId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(learner.clone()).or_default())
    }

    /// Drop the map entry once `lock` is the last handle besides the map's own.
    async fn release_lock(&self, learner: &LearnerId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        let idle = locks
            .get(learner)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        // Release our handle while the map is still locked so the next
        // caller sees an accurate count.
        drop(lock);
        if idle {
            locks.remove(learner);
        }
    }

    /// Current record for `learner`, or a zero record if none exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Storage` if the backend cannot be read.
    pub async fn get(&self, learner: &LearnerId) -> Result<ProgressRecord, ProgressStoreError> {
        let stored = self.repo.load_progress(learner).await?;
        Ok(stored.map(|stored| stored.record).unwrap_or_default())
    }

    /// Apply one answer event and persist it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Storage` on read/write failure, including
    /// `StorageError::Conflict` when another writer saved first.
    pub async fn record_answer(
        &self,
        learner: &LearnerId,
        question: &Question,
        is_correct: bool,
    ) -> Result<ProgressRecord, ProgressStoreError> {
        Ok(self
            .record_answer_detailed(learner, question, is_correct)
            .await?
            .record)
    }

    /// Like [`record_answer`](Self::record_answer) but also reports points
    /// awarded and badges earned by this answer.
    ///
    /// # Errors
    ///
    /// See [`record_answer`](Self::record_answer).
    pub async fn record_answer_detailed(
        &self,
        learner: &LearnerId,
        question: &Question,
        is_correct: bool,
    ) -> Result<AnswerReceipt, ProgressStoreError> {
        let lock = self.learner_lock(learner).await;
        let receipt = {
            let _guard = lock.lock().await;
            self.apply_and_save(learner, question, is_correct).await
        };
        self.release_lock(learner, lock).await;
        receipt
    }

    async fn apply_and_save(
        &self,
        learner: &LearnerId,
        question: &Question,
        is_correct: bool,
    ) -> Result<AnswerReceipt, ProgressStoreError> {
        let (mut record, expected_version) = match self.repo.load_progress(learner).await? {
            Some(stored) => (stored.record, stored.version),
            None => (ProgressRecord::new(), 0),
        };

        let effect = record.apply_answer(question, is_correct);
        let version = self
            .repo
            .save_progress(learner, &record, expected_version, self.clock.now())
            .await?;

        debug!(
            learner = %learner,
            question = %question.id(),
            skill = %question.skill(),
            is_correct,
            points = record.points(),
            streak = record.streak(),
            version,
            "recorded answer"
        );
        for badge in &effect.new_badges {
            info!(learner = %learner, badge = %badge, "badge earned");
        }

        Ok(AnswerReceipt {
            record,
            effect,
            version,
        })
    }

    /// Reset `learner` to the zero record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Storage` if the backend cannot be written.
    pub async fn reset(&self, learner: &LearnerId) -> Result<ProgressRecord, ProgressStoreError> {
        let lock = self.learner_lock(learner).await;
        let existed = {
            let _guard = lock.lock().await;
            self.repo.delete_progress(learner).await
        };
        self.release_lock(learner, lock).await;

        let existed = existed?;
        info!(learner = %learner, existed, "progress reset");
        Ok(ProgressRecord::new())
    }
}
