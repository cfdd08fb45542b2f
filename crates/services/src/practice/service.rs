use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::debug;

use prep_core::AdaptiveSelector;
use prep_core::model::{Badge, LearnerId, ProgressRecord, Question, QuestionId};

use super::progress::SessionTally;
use crate::error::PracticeError;
use crate::progress_store::ProgressStore;

//
// ─── ANSWER OUTCOME ────────────────────────────────────────────────────────────
//

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub correct_index: usize,
    pub points_awarded: u32,
    pub new_badges: Vec<Badge>,
    /// Learner's record after this answer was persisted.
    pub record: ProgressRecord,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Adaptive practice session for one learner.
///
/// Each call to [`next_question`](Self::next_question) reads the learner's
/// latest progress and draws from the pool with [`AdaptiveSelector`], so
/// weak skills come up more often as the session goes on.
pub struct PracticeSession {
    learner: LearnerId,
    pool: Vec<Question>,
    selector: AdaptiveSelector,
    rng: StdRng,
    store: Arc<ProgressStore>,
    limit: Option<u32>,
    current: Option<Question>,
    answered_current: bool,
    tally: SessionTally,
}

impl PracticeSession {
    /// Create a session over `pool`. `limit` caps the number of answers.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Empty` if `pool` is empty or `limit` is zero.
    pub fn new(
        learner: LearnerId,
        pool: Vec<Question>,
        store: Arc<ProgressStore>,
        rng: StdRng,
        limit: Option<u32>,
    ) -> Result<Self, PracticeError> {
        if pool.is_empty() || limit == Some(0) {
            return Err(PracticeError::Empty);
        }

        Ok(Self {
            learner,
            pool,
            selector: AdaptiveSelector::new(),
            rng,
            store,
            limit,
            current: None,
            answered_current: false,
            tally: SessionTally::default(),
        })
    }

    #[must_use]
    pub fn learner(&self) -> &LearnerId {
        &self.learner
    }

    #[must_use]
    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    #[must_use]
    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    /// Question waiting for an answer, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref().filter(|_| !self.answered_current)
    }

    /// Number of answers still allowed, or `None` for an open-ended session.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.limit
            .map(|limit| limit.saturating_sub(self.tally.answered))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Draw the next question. An unanswered current question is returned
    /// again instead of being replaced.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Completed` once the limit is reached, or
    /// `PracticeError::Progress` if the learner's record cannot be read.
    pub async fn next_question(&mut self) -> Result<&Question, PracticeError> {
        if self.is_complete() {
            return Err(PracticeError::Completed);
        }

        if self.current.is_none() || self.answered_current {
            let progress = self.store.get(&self.learner).await?;
            let chosen = self
                .selector
                .select(&self.pool, &progress, &mut self.rng)?
                .clone();
            debug!(
                learner = %self.learner,
                question = %chosen.id(),
                skill = %chosen.skill(),
                "selected question"
            );
            self.current = Some(chosen);
            self.answered_current = false;
        }

        self.current.as_ref().ok_or(PracticeError::NoCurrentQuestion)
    }

    /// Answer the current question with the zero-based `choice` and persist
    /// the result to the learner's progress.
    ///
    /// # Errors
    ///
    /// - `NoCurrentQuestion` if `next_question` has not been called
    /// - `AlreadyAnswered` if the current question was already answered
    /// - `InvalidChoice` if `choice` is out of range
    /// - `Progress` if persisting the answer fails; the question stays
    ///   unanswered so the caller may try again
    pub async fn answer(&mut self, choice: usize) -> Result<AnswerOutcome, PracticeError> {
        let question = self
            .current
            .as_ref()
            .ok_or(PracticeError::NoCurrentQuestion)?;
        if self.answered_current {
            return Err(PracticeError::AlreadyAnswered);
        }
        let len = question.choices().len();
        if choice >= len {
            return Err(PracticeError::InvalidChoice { choice, len });
        }

        let is_correct = question.is_correct(choice);
        let receipt = self
            .store
            .record_answer_detailed(&self.learner, question, is_correct)
            .await?;

        self.answered_current = true;
        self.tally.record(is_correct, receipt.effect.points_awarded);

        Ok(AnswerOutcome {
            question_id: question.id().clone(),
            is_correct,
            correct_index: question.correct_index(),
            points_awarded: receipt.effect.points_awarded,
            new_badges: receipt.effect.new_badges,
            record: receipt.record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{Difficulty, Skill};
    use prep_core::time::fixed_clock;
    use rand::SeedableRng;
    use storage::repository::InMemoryRepository;

    fn question(id: u64, skill: &str, difficulty: Difficulty) -> Question {
        Question::new(
            QuestionId::from(id),
            Skill::new(skill),
            difficulty,
            vec!["a".into(), "b".into(), "c".into()],
            1,
        )
        .unwrap()
    }

    fn session(limit: Option<u32>) -> PracticeSession {
        let store = Arc::new(ProgressStore::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
        ));
        PracticeSession::new(
            LearnerId::new("ada").unwrap(),
            vec![
                question(1, "Algebra", Difficulty::Easy),
                question(2, "Geometry", Difficulty::Hard),
            ],
            store,
            StdRng::seed_from_u64(7),
            limit,
        )
        .unwrap()
    }

    #[test]
    fn empty_pool_or_zero_limit_is_rejected() {
        let store = Arc::new(ProgressStore::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
        ));
        let learner = LearnerId::new("ada").unwrap();
        let empty = PracticeSession::new(
            learner.clone(),
            Vec::new(),
            Arc::clone(&store),
            StdRng::seed_from_u64(1),
            None,
        );
        assert!(matches!(empty, Err(PracticeError::Empty)));

        let zero = PracticeSession::new(
            learner,
            vec![question(1, "Algebra", Difficulty::Easy)],
            store,
            StdRng::seed_from_u64(1),
            Some(0),
        );
        assert!(matches!(zero, Err(PracticeError::Empty)));
    }

    #[tokio::test]
    async fn answer_before_next_question_is_rejected() {
        let mut session = session(None);
        let err = session.answer(0).await.unwrap_err();
        assert!(matches!(err, PracticeError::NoCurrentQuestion));
    }

    #[tokio::test]
    async fn next_question_is_stable_until_answered() {
        let mut session = session(None);
        let first = session.next_question().await.unwrap().id().clone();
        let again = session.next_question().await.unwrap().id().clone();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn answering_updates_progress_and_tally() {
        let mut session = session(None);
        let question = session.next_question().await.unwrap().clone();

        let outcome = session.answer(1).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.question_id, *question.id());
        assert_eq!(outcome.correct_index, 1);
        assert_eq!(outcome.points_awarded, question.point_value());
        assert_eq!(outcome.record.points(), question.point_value());
        assert_eq!(session.tally().answered, 1);
        assert!(session.current_question().is_none());
    }

    #[tokio::test]
    async fn double_answer_and_bad_choice_are_rejected() {
        let mut session = session(None);
        session.next_question().await.unwrap();

        let err = session.answer(3).await.unwrap_err();
        assert!(matches!(err, PracticeError::InvalidChoice { choice: 3, len: 3 }));

        session.answer(0).await.unwrap();
        let err = session.answer(1).await.unwrap_err();
        assert!(matches!(err, PracticeError::AlreadyAnswered));
        assert_eq!(session.tally().answered, 1);
        assert_eq!(session.tally().correct, 0);
    }

    #[tokio::test]
    async fn limit_completes_the_session() {
        let mut session = session(Some(2));
        for _ in 0..2 {
            session.next_question().await.unwrap();
            session.answer(1).await.unwrap();
        }
        assert!(session.is_complete());
        assert_eq!(session.remaining(), Some(0));
        let err = session.next_question().await.unwrap_err();
        assert!(matches!(err, PracticeError::Completed));
    }
}
