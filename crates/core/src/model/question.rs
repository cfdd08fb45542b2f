use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{QuestionId, Skill};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a question is rejected at ingestion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidQuestionError {
    #[error("question has no choices")]
    NoChoices,

    #[error("correct index {index} is out of range for {len} choices")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("question has no correct answer")]
    MissingCorrectAnswer,

    #[error("correct answer key {key:?} does not match any choice")]
    UnknownAnswerKey { key: String },

    #[error("unknown difficulty: {0:?}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Ordered difficulty level. Only affects how many points a correct answer earns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Points awarded for a correct answer at this difficulty.
    ///
    /// Tiered scheme: Easy 10, Medium 20, Hard 30.
    #[must_use]
    pub fn point_value(self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }

    /// Maps a numeric level (1-3) to a difficulty.
    #[must_use]
    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = InvalidQuestionError;

    /// Accepts names ("hard"), initials ("H") and levels ("3").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(level) = trimmed.parse::<u64>() {
            return Self::from_level(level)
                .ok_or_else(|| InvalidQuestionError::UnknownDifficulty(s.to_owned()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "e" | "easy" => Ok(Difficulty::Easy),
            "m" | "medium" => Ok(Difficulty::Medium),
            "h" | "hard" => Ok(Difficulty::Hard),
            _ => Err(InvalidQuestionError::UnknownDifficulty(s.to_owned())),
        }
    }
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Unvalidated question as produced by a bank normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub skill: Skill,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub assessment: Option<String>,
}

impl QuestionDraft {
    /// Check the choice invariants and freeze the draft into a `Question`.
    ///
    /// # Errors
    ///
    /// - `NoChoices` if `choices` is empty
    /// - `CorrectIndexOutOfRange` if `correct_index >= choices.len()`
    pub fn validate(self) -> Result<Question, InvalidQuestionError> {
        if self.choices.is_empty() {
            return Err(InvalidQuestionError::NoChoices);
        }
        if self.correct_index >= self.choices.len() {
            return Err(InvalidQuestionError::CorrectIndexOutOfRange {
                index: self.correct_index,
                len: self.choices.len(),
            });
        }

        Ok(Question {
            id: self.id,
            skill: self.skill,
            difficulty: self.difficulty,
            prompt: self.prompt,
            choices: self.choices,
            correct_index: self.correct_index,
            explanation: self.explanation.filter(|text| !text.trim().is_empty()),
            assessment: self.assessment.filter(|text| !text.trim().is_empty()),
        })
    }
}

/// Immutable, validated multiple-choice question.
///
/// Invariant: `correct_index < choices.len()` and `choices` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    skill: Skill,
    difficulty: Difficulty,
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
    assessment: Option<String>,
}

impl Question {
    /// Shorthand for building a question without display-only fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuestionError` under the same rules as [`QuestionDraft::validate`].
    pub fn new(
        id: QuestionId,
        skill: Skill,
        difficulty: Difficulty,
        choices: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, InvalidQuestionError> {
        QuestionDraft {
            id,
            skill,
            difficulty,
            prompt: String::new(),
            choices,
            correct_index,
            explanation: None,
            assessment: None,
        }
        .validate()
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn skill(&self) -> &Skill {
        &self.skill
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn assessment(&self) -> Option<&str> {
        self.assessment.as_deref()
    }

    /// Returns true when `choice` is the correct answer.
    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }

    /// Points this question is worth when answered correctly.
    #[must_use]
    pub fn point_value(&self) -> u32 {
        self.difficulty.point_value()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
