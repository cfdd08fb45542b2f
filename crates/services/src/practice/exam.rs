use std::collections::HashMap;
use std::sync::Arc;

use prep_core::model::{LearnerId, Question, QuestionId};

use super::progress::SessionTally;
use super::service::AnswerOutcome;
use crate::error::PracticeError;
use crate::progress_store::ProgressStore;

/// Choice recorded for one exam question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamAnswer {
    pub choice: usize,
    pub is_correct: bool,
}

/// Fixed-order walk through a question pool.
///
/// Unlike [`PracticeSession`](super::PracticeSession) there is no adaptive
/// selection: the learner moves back and forth with [`move_next`](Self::move_next) and
/// [`move_prev`](Self::move_prev), and each question accepts exactly one answer.
/// Answers still count toward cumulative progress.
pub struct ExamSession {
    learner: LearnerId,
    questions: Vec<Question>,
    position: usize,
    answers: HashMap<QuestionId, ExamAnswer>,
    store: Arc<ProgressStore>,
    tally: SessionTally,
}

impl ExamSession {
    /// # Errors
    ///
    /// Returns `PracticeError::Empty` if `questions` is empty.
    pub fn new(
        learner: LearnerId,
        questions: Vec<Question>,
        store: Arc<ProgressStore>,
    ) -> Result<Self, PracticeError> {
        if questions.is_empty() {
            return Err(PracticeError::Empty);
        }
        Ok(Self {
            learner,
            questions,
            position: 0,
            answers: HashMap::new(),
            store,
            tally: SessionTally::default(),
        })
    }

    #[must_use]
    pub fn learner(&self) -> &LearnerId {
        &self.learner
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Zero-based index of the question on screen.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn current(&self) -> &Question {
        &self.questions[self.position]
    }

    /// Answer already given for the question on screen.
    #[must_use]
    pub fn current_answer(&self) -> Option<ExamAnswer> {
        self.answers.get(self.current().id()).copied()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.answers.len() == self.questions.len()
    }

    #[must_use]
    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    /// Move forward one question. Returns `false` at the last question.
    pub fn move_next(&mut self) -> bool {
        if self.position + 1 < self.questions.len() {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Move back one question. Returns `false` at the first question.
    pub fn move_prev(&mut self) -> bool {
        if self.position > 0 {
            self.position -= 1;
            true
        } else {
            false
        }
    }

    /// Answer the question on screen and persist it to the learner's progress.
    ///
    /// # Errors
    ///
    /// - `AlreadyAnswered` if this question already has an answer
    /// - `InvalidChoice` if `choice` is out of range
    /// - `Progress` if persisting fails; the question stays unanswered
    pub async fn answer(&mut self, choice: usize) -> Result<AnswerOutcome, PracticeError> {
        let question = &self.questions[self.position];
        if self.answers.contains_key(question.id()) {
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

        self.answers
            .insert(question.id().clone(), ExamAnswer { choice, is_correct });
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
    use storage::repository::InMemoryRepository;

    fn question(id: u64, skill: &str) -> Question {
        Question::new(
            QuestionId::from(id),
            Skill::new(skill),
            Difficulty::Easy,
            vec!["a".into(), "b".into()],
            0,
        )
        .unwrap()
    }

    fn exam() -> (ExamSession, Arc<ProgressStore>) {
        let store = Arc::new(ProgressStore::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
        ));
        let session = ExamSession::new(
            LearnerId::new("ada").unwrap(),
            vec![
                question(1, "Algebra"),
                question(2, "Geometry"),
                question(3, "Algebra"),
            ],
            Arc::clone(&store),
        )
        .unwrap();
        (session, store)
    }

    #[test]
    fn empty_exam_is_rejected() {
        let store = Arc::new(ProgressStore::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
        ));
        let err = ExamSession::new(LearnerId::new("ada").unwrap(), Vec::new(), store);
        assert!(matches!(err, Err(PracticeError::Empty)));
    }

    #[test]
    fn navigation_walks_in_order_and_clamps() {
        let (mut exam, _) = exam();
        assert!(!exam.move_prev());
        assert_eq!(exam.current().id().as_str(), "1");

        assert!(exam.move_next());
        assert!(exam.move_next());
        assert_eq!(exam.current().id().as_str(), "3");
        assert!(!exam.move_next());
        assert_eq!(exam.position(), 2);

        assert!(exam.move_prev());
        assert_eq!(exam.current().id().as_str(), "2");
    }

    #[tokio::test]
    async fn each_question_takes_one_answer() {
        let (mut exam, store) = exam();
        let outcome = exam.answer(0).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(
            exam.current_answer(),
            Some(ExamAnswer {
                choice: 0,
                is_correct: true
            })
        );

        let err = exam.answer(1).await.unwrap_err();
        assert!(matches!(err, PracticeError::AlreadyAnswered));

        // Coming back to an answered question keeps the first answer.
        exam.move_next();
        exam.move_prev();
        assert!(matches!(
            exam.answer(1).await,
            Err(PracticeError::AlreadyAnswered)
        ));
        assert_eq!(exam.answered_count(), 1);
        assert_eq!(store.get(exam.learner()).await.unwrap().points(), 10);
    }

    #[tokio::test]
    async fn answers_feed_cumulative_progress() {
        let (mut exam, store) = exam();
        exam.answer(0).await.unwrap();
        exam.move_next();
        let err = exam.answer(2).await.unwrap_err();
        assert!(matches!(err, PracticeError::InvalidChoice { choice: 2, len: 2 }));
        exam.answer(1).await.unwrap();
        exam.move_next();
        exam.answer(0).await.unwrap();

        assert!(exam.is_finished());
        assert_eq!(exam.answered_count(), 3);
        assert_eq!(exam.tally().correct, 2);

        let record = store.get(exam.learner()).await.unwrap();
        let algebra = record.stat(&Skill::new("Algebra")).unwrap();
        assert_eq!((algebra.attempts(), algebra.correct()), (2, 2));
        let geometry = record.stat(&Skill::new("Geometry")).unwrap();
        assert_eq!((geometry.attempts(), geometry.correct()), (1, 0));
        assert_eq!(record.streak(), 1);
    }
}
