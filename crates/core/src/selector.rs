use std::collections::HashSet;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::model::{ProgressRecord, Question, Skill};

/// Accuracy assumed for a skill the learner has never answered.
///
/// Puts unseen skills at moderate priority: weaker than a skill the learner
/// keeps missing, stronger than one they have mastered.
pub const NEUTRAL_ACCURACY: f64 = 0.6;

/// Lowest weight a skill can have, so mastered skills still come back.
pub const MIN_SKILL_WEIGHT: f64 = 0.05;

/// Lowest weight a single question can have under [`SelectionPolicy::FlatPerQuestion`].
pub const MIN_QUESTION_WEIGHT: f64 = 1.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Selection was asked to choose from zero candidates.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot select a question from an empty pool")]
pub struct EmptyPoolError;

//
// ─── WEIGHTING ─────────────────────────────────────────────────────────────────
//

/// How candidate questions are weighted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Draw a skill by `max(0.05, 1 - accuracy)`, then a question uniformly
    /// within that skill. Every skill in the pool keeps a non-zero chance.
    #[default]
    SkillFirst,
    /// Draw directly over all questions by `max(1, 1 / (accuracy + 0.1))`.
    /// Skills with many questions in the pool get sampled more often.
    FlatPerQuestion,
}

/// Observed accuracy for `skill`, or [`NEUTRAL_ACCURACY`] without history.
#[must_use]
pub fn observed_accuracy(progress: &ProgressRecord, skill: &Skill) -> f64 {
    progress
        .stat(skill)
        .and_then(|stat| stat.accuracy())
        .unwrap_or(NEUTRAL_ACCURACY)
}

/// Skill-level sampling weight: lower accuracy, higher weight.
#[must_use]
pub fn skill_weight(accuracy: f64) -> f64 {
    (1.0 - accuracy).max(MIN_SKILL_WEIGHT)
}

/// Question-level sampling weight for the flat policy.
#[must_use]
pub fn question_weight(accuracy: f64) -> f64 {
    (1.0 / (accuracy + 0.1)).max(MIN_QUESTION_WEIGHT)
}

//
// ─── SELECTOR ──────────────────────────────────────────────────────────────────
//

/// Chooses the next question, biased toward skills where the learner is weak.
///
/// Stateless apart from its policy; it only reads the progress snapshot and
/// consumes randomness from the caller's RNG.
///
/// # Examples
///
/// ```
/// # use prep_core::model::{Difficulty, ProgressRecord, Question, QuestionId, Skill};
/// # use prep_core::AdaptiveSelector;
/// use rand::SeedableRng;
///
/// let pool = vec![
///     Question::new(QuestionId::from(1), Skill::new("Algebra"), Difficulty::Easy,
///         vec!["1".into(), "2".into()], 0)?,
/// ];
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let next = AdaptiveSelector::new().select(&pool, &ProgressRecord::new(), &mut rng)?;
/// assert_eq!(next.id(), &QuestionId::from(1));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdaptiveSelector {
    policy: SelectionPolicy,
}

impl AdaptiveSelector {
    /// Selector using the default two-stage skill-first policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Distinct skills of `pool` in first-appearance order, with their weights.
    #[must_use]
    pub fn skill_weights<'a>(
        pool: &'a [Question],
        progress: &ProgressRecord,
    ) -> Vec<(&'a Skill, f64)> {
        let mut seen = HashSet::new();
        pool.iter()
            .map(Question::skill)
            .filter(|skill| seen.insert(*skill))
            .map(|skill| (skill, skill_weight(observed_accuracy(progress, skill))))
            .collect()
    }

    /// Pick one question from `pool`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyPoolError` if `pool` is empty.
    pub fn select<'a, R: Rng + ?Sized>(
        &self,
        pool: &'a [Question],
        progress: &ProgressRecord,
        rng: &mut R,
    ) -> Result<&'a Question, EmptyPoolError> {
        if pool.is_empty() {
            return Err(EmptyPoolError);
        }

        let picked = match self.policy {
            SelectionPolicy::SkillFirst => select_skill_first(pool, progress, rng),
            SelectionPolicy::FlatPerQuestion => select_flat(pool, progress, rng),
        };

        picked.ok_or(EmptyPoolError)
    }

    /// Exact probability of each question being returned by [`Self::select`].
    ///
    /// Entries follow `pool` order and sum to 1 for a non-empty pool.
    #[must_use]
    pub fn probabilities<'a>(
        &self,
        pool: &'a [Question],
        progress: &ProgressRecord,
    ) -> Vec<(&'a Question, f64)> {
        match self.policy {
            SelectionPolicy::SkillFirst => {
                let weights = Self::skill_weights(pool, progress);
                let total: f64 = weights.iter().map(|(_, w)| w).sum();
                pool.iter()
                    .map(|question| {
                        let weight = weights
                            .iter()
                            .find(|(skill, _)| *skill == question.skill())
                            .map_or(0.0, |(_, w)| *w);
                        let siblings = pool.iter().filter(|q| q.skill() == question.skill()).count();
                        #[allow(clippy::cast_precision_loss)]
                        let share = weight / total / siblings as f64;
                        (question, share)
                    })
                    .collect()
            }
            SelectionPolicy::FlatPerQuestion => {
                let weights: Vec<f64> = pool
                    .iter()
                    .map(|q| question_weight(observed_accuracy(progress, q.skill())))
                    .collect();
                let total: f64 = weights.iter().sum();
                pool.iter().zip(weights).map(|(q, w)| (q, w / total)).collect()
            }
        }
    }
}

fn select_skill_first<'a, R: Rng + ?Sized>(
    pool: &'a [Question],
    progress: &ProgressRecord,
    rng: &mut R,
) -> Option<&'a Question> {
    let weights = AdaptiveSelector::skill_weights(pool, progress);
    let drawn_skill = WeightedIndex::<f64>::new(weights.iter().map(|(_, w)| *w))
        .ok()
        .map(|dist| weights[dist.sample(rng)].0);

    let candidates: Vec<&Question> = match drawn_skill {
        Some(skill) => pool.iter().filter(|q| q.skill() == skill).collect(),
        None => Vec::new(),
    };

    // Uniform over the whole pool if the skill draw came back empty.
    candidates
        .choose(rng)
        .copied()
        .or_else(|| pool.choose(rng))
}

fn select_flat<'a, R: Rng + ?Sized>(
    pool: &'a [Question],
    progress: &ProgressRecord,
    rng: &mut R,
) -> Option<&'a Question> {
    let weights = pool
        .iter()
        .map(|q| question_weight(observed_accuracy(progress, q.skill())));
    match WeightedIndex::<f64>::new(weights) {
        Ok(dist) => pool.get(dist.sample(rng)),
        Err(_) => pool.choose(rng),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
