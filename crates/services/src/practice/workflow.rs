use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use prep_core::model::LearnerId;

use super::exam::ExamSession;
use super::service::PracticeSession;
use crate::banks::{QuestionBank, QuestionFilter};
use crate::error::PracticeError;
use crate::progress_store::ProgressStore;

/// Default number of questions in a practice session.
pub const DEFAULT_SESSION_LENGTH: u32 = 10;

/// Options for starting a practice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeConfig {
    pub filter: QuestionFilter,
    /// `None` for an open-ended session.
    pub limit: Option<u32>,
    /// Fixed RNG seed for reproducible selection.
    pub seed: Option<u64>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            filter: QuestionFilter::default(),
            limit: Some(DEFAULT_SESSION_LENGTH),
            seed: None,
        }
    }
}

/// Starts practice sessions from a question bank and a progress store.
#[derive(Clone)]
pub struct PracticeLoopService {
    bank: Arc<dyn QuestionBank>,
    store: Arc<ProgressStore>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(bank: Arc<dyn QuestionBank>, store: Arc<ProgressStore>) -> Self {
        Self { bank, store }
    }

    #[must_use]
    pub fn store(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.store)
    }

    /// Load the question pool for `config` and start a session for `learner`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Bank` if the pool cannot be loaded or is
    /// empty after filtering.
    pub async fn start_session(
        &self,
        learner: LearnerId,
        config: &PracticeConfig,
    ) -> Result<PracticeSession, PracticeError> {
        let pool = self.bank.load(&config.filter).await?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        debug!(learner = %learner, pool = pool.len(), limit = ?config.limit, "starting practice");
        PracticeSession::new(learner, pool, Arc::clone(&self.store), rng, config.limit)
    }

    /// Load the pool for `config` and start an exam over it in bank order.
    ///
    /// `config.limit` keeps only the first that many questions; the seed is
    /// unused because exams do not sample.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Bank` if the pool cannot be loaded or is
    /// empty after filtering, or `PracticeError::Empty` for a zero limit.
    pub async fn start_exam(
        &self,
        learner: LearnerId,
        config: &PracticeConfig,
    ) -> Result<ExamSession, PracticeError> {
        let mut pool = self.bank.load(&config.filter).await?;
        if let Some(limit) = config.limit {
            pool.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        debug!(learner = %learner, questions = pool.len(), "starting exam");
        ExamSession::new(learner, pool, Arc::clone(&self.store))
    }
}
