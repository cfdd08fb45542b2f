//! Turns question-bank entries into canonical [`Question`]s.
//!
//! Two source shapes are accepted. Local banks list choices as an array and
//! name the correct one by index:
//!
//! ```json
//! { "id": 7, "skill": "Algebra", "difficulty": "Hard",
//!   "question": "2x = 6, x = ?", "choices": ["2", "3"], "answer": 1 }
//! ```
//!
//! OpenSAT entries nest the body and key choices by letter:
//!
//! ```json
//! { "id": "a1b2", "domain": "Algebra", "difficulty": "M",
//!   "question": { "paragraph": "…", "question": "…",
//!                 "choices": { "A": "2", "B": "3" }, "correct_answer": "B" } }
//! ```
//!
//! Skill fallback, difficulty mapping, answer-key resolution and choice
//! de-duplication all happen here, once, so the selector and the progress
//! record only ever see a single canonical `skill`.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::model::{Difficulty, InvalidQuestionError, Question, QuestionDraft, QuestionId, Skill};

//
// ─── RAW SHAPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawDifficulty {
    Level(u64),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawChoices {
    List(Vec<String>),
    Keyed(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    Index(usize),
    Key(String),
}

/// Nested OpenSAT question body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawBody {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub paragraph: Option<String>,
    #[serde(default)]
    pub choices: Option<RawChoices>,
    #[serde(default)]
    pub correct_answer: Option<RawAnswer>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawPrompt {
    Text(String),
    Body(Box<RawBody>),
}

/// One bank entry as found on disk or on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<RawDifficulty>,
    #[serde(default)]
    pub assessment: Option<String>,
    #[serde(default)]
    pub question: Option<RawPrompt>,
    #[serde(default)]
    pub choices: Option<RawChoices>,
    #[serde(default, alias = "correct", alias = "correct_index")]
    pub answer: Option<RawAnswer>,
    #[serde(default)]
    pub explanation: Option<String>,
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

impl RawQuestion {
    /// Normalize this entry into a validated [`Question`].
    ///
    /// # Errors
    ///
    /// - `UnknownDifficulty` for an unrecognised difficulty label or level
    /// - `MissingCorrectAnswer` / `UnknownAnswerKey` if the answer cannot be resolved
    /// - `NoChoices` / `CorrectIndexOutOfRange` from validation
    pub fn normalize(self) -> Result<Question, InvalidQuestionError> {
        let body = match self.question {
            Some(RawPrompt::Body(body)) => *body,
            Some(RawPrompt::Text(text)) => RawBody {
                question: Some(text),
                ..RawBody::default()
            },
            None => RawBody::default(),
        };

        let skill = Skill::resolve([
            self.skill.as_deref(),
            self.domain.as_deref(),
            self.category.as_deref(),
        ]);

        let difficulty = match self.difficulty {
            None => Difficulty::default(),
            Some(RawDifficulty::Level(level)) => Difficulty::from_level(level)
                .ok_or_else(|| InvalidQuestionError::UnknownDifficulty(level.to_string()))?,
            Some(RawDifficulty::Label(label)) if label.trim().is_empty() => Difficulty::default(),
            Some(RawDifficulty::Label(label)) => label.parse()?,
        };

        let id = match self.id {
            Some(RawId::Number(n)) => QuestionId::from(n),
            Some(RawId::Text(text)) => {
                QuestionId::new(text).unwrap_or_else(|_| QuestionId::generate())
            }
            None => QuestionId::generate(),
        };

        let (keys, choices) = split_choices(self.choices.or(body.choices));
        let answer = self
            .answer
            .or(body.correct_answer)
            .ok_or(InvalidQuestionError::MissingCorrectAnswer)?;
        let correct_index = resolve_answer(&answer, keys.as_deref(), &choices)?;
        let (choices, correct_index) = dedup_choices(choices, correct_index)?;

        let prompt = [body.paragraph, body.question]
            .into_iter()
            .flatten()
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        QuestionDraft {
            id,
            skill,
            difficulty,
            prompt,
            choices,
            correct_index,
            explanation: self.explanation.or(body.explanation),
            assessment: self.assessment,
        }
        .validate()
    }
}

/// Returns the letter keys (for keyed choices) and the choice texts in order.
fn split_choices(raw: Option<RawChoices>) -> (Option<Vec<String>>, Vec<String>) {
    match raw {
        None => (None, Vec::new()),
        Some(RawChoices::List(list)) => (None, list),
        Some(RawChoices::Keyed(map)) => {
            let (keys, values) = map.into_iter().unzip();
            (Some(keys), values)
        }
    }
}

fn resolve_answer(
    answer: &RawAnswer,
    keys: Option<&[String]>,
    choices: &[String],
) -> Result<usize, InvalidQuestionError> {
    let key = match answer {
        RawAnswer::Index(index) => return Ok(*index),
        RawAnswer::Key(key) => key.trim(),
    };

    if let Some(keys) = keys {
        if let Some(pos) = keys.iter().position(|k| k.trim().eq_ignore_ascii_case(key)) {
            return Ok(pos);
        }
    }
    if let Ok(index) = key.parse::<usize>() {
        return Ok(index);
    }
    if let [letter] = key.as_bytes() {
        if letter.is_ascii_alphabetic() {
            return Ok(usize::from(letter.to_ascii_uppercase() - b'A'));
        }
    }
    choices
        .iter()
        .position(|choice| choice.trim() == key)
        .ok_or_else(|| InvalidQuestionError::UnknownAnswerKey {
            key: key.to_owned(),
        })
}

/// Drop repeated choice texts, keeping the first occurrence and remapping the
/// correct index onto it.
fn dedup_choices(
    choices: Vec<String>,
    correct_index: usize,
) -> Result<(Vec<String>, usize), InvalidQuestionError> {
    let correct_text = choices
        .get(correct_index)
        .map(|text| text.trim().to_owned())
        .ok_or(if choices.is_empty() {
            InvalidQuestionError::NoChoices
        } else {
            InvalidQuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: choices.len(),
            }
        })?;

    let mut unique: Vec<String> = Vec::with_capacity(choices.len());
    for choice in choices {
        if !unique.iter().any(|kept| kept.trim() == choice.trim()) {
            unique.push(choice);
        }
    }

    let index = unique
        .iter()
        .position(|kept| kept.trim() == correct_text)
        .unwrap_or(correct_index);
    Ok((unique, index))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GENERAL_SKILL;

    fn parse(json: &str) -> RawQuestion {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn local_bank_entry_normalizes() {
        let q = parse(
            r#"{"id": 7, "skill": "Algebra", "difficulty": "Hard",
                "question": "2x = 6, x = ?", "choices": ["2", "3", "4"], "answer": 1,
                "explanation": "divide by 2"}"#,
        )
        .normalize()
        .unwrap();

        assert_eq!(q.id(), &QuestionId::from(7));
        assert_eq!(q.skill().as_str(), "Algebra");
        assert_eq!(q.difficulty(), Difficulty::Hard);
        assert_eq!(q.prompt(), "2x = 6, x = ?");
        assert_eq!(q.correct_index(), 1);
        assert_eq!(q.explanation(), Some("divide by 2"));
    }

    #[test]
    fn opensat_entry_resolves_letter_key_and_domain() {
        let q = parse(
            r#"{"id": "abc", "domain": "Geometry and Trigonometry", "difficulty": "M",
                "question": {"paragraph": "A triangle...", "question": "Find the angle.",
                             "choices": {"A": "30", "B": "45", "C": "60", "D": "90"},
                             "correct_answer": "C", "explanation": "Sum is 180."}}"#,
        )
        .normalize()
        .unwrap();

        assert_eq!(q.id().as_str(), "abc");
        assert_eq!(q.skill().as_str(), "Geometry and Trigonometry");
        assert_eq!(q.difficulty(), Difficulty::Medium);
        assert_eq!(q.choices(), ["30", "45", "60", "90"]);
        assert_eq!(q.correct_index(), 2);
        assert_eq!(q.prompt(), "A triangle...\n\nFind the angle.");
        assert_eq!(q.explanation(), Some("Sum is 180."));
    }

    #[test]
    fn skill_falls_back_through_domain_and_category() {
        let from_category = parse(r#"{"category": "Craft", "choices": ["a"], "answer": 0}"#)
            .normalize()
            .unwrap();
        assert_eq!(from_category.skill().as_str(), "Craft");

        let general = parse(r#"{"skill": " ", "choices": ["a"], "answer": 0}"#)
            .normalize()
            .unwrap();
        assert_eq!(general.skill().as_str(), GENERAL_SKILL);
    }

    #[test]
    fn numeric_and_missing_difficulty() {
        let q = parse(r#"{"difficulty": 3, "choices": ["a"], "answer": 0}"#)
            .normalize()
            .unwrap();
        assert_eq!(q.difficulty(), Difficulty::Hard);

        let q = parse(r#"{"choices": ["a"], "answer": 0}"#).normalize().unwrap();
        assert_eq!(q.difficulty(), Difficulty::Medium);

        let err = parse(r#"{"difficulty": 9, "choices": ["a"], "answer": 0}"#)
            .normalize()
            .unwrap_err();
        assert!(matches!(err, InvalidQuestionError::UnknownDifficulty(_)));
    }

    #[test]
    fn missing_id_gets_generated() {
        let q = parse(r#"{"choices": ["a"], "answer": 0}"#).normalize().unwrap();
        assert!(!q.id().as_str().is_empty());
    }

    #[test]
    fn duplicate_choices_are_removed_and_answer_remapped() {
        let q = parse(r#"{"choices": ["x", "y", "x", "z"], "answer": 3}"#)
            .normalize()
            .unwrap();
        assert_eq!(q.choices(), ["x", "y", "z"]);
        assert_eq!(q.correct_index(), 2);

        let q = parse(r#"{"choices": ["x", "y", "x"], "answer": 2}"#)
            .normalize()
            .unwrap();
        assert_eq!(q.choices(), ["x", "y"]);
        assert_eq!(q.correct_index(), 0);
    }

    #[test]
    fn malformed_entries_are_rejected_not_coerced() {
        let err = parse(r#"{"choices": [], "answer": 0}"#).normalize().unwrap_err();
        assert_eq!(err, InvalidQuestionError::NoChoices);

        let err = parse(r#"{"choices": ["a", "b"], "answer": 5}"#)
            .normalize()
            .unwrap_err();
        assert_eq!(
            err,
            InvalidQuestionError::CorrectIndexOutOfRange { index: 5, len: 2 }
        );

        let err = parse(r#"{"choices": ["a", "b"]}"#).normalize().unwrap_err();
        assert_eq!(err, InvalidQuestionError::MissingCorrectAnswer);

        let err = parse(
            r#"{"question": {"choices": {"A": "1", "B": "2"}, "correct_answer": "banana"}}"#,
        )
        .normalize()
        .unwrap_err();
        assert!(matches!(err, InvalidQuestionError::UnknownAnswerKey { .. }));
    }

    #[test]
    fn answer_can_be_given_as_choice_text() {
        let q = parse(r#"{"choices": ["red", "blue"], "answer": "blue"}"#)
            .normalize()
            .unwrap();
        assert_eq!(q.correct_index(), 1);
    }
}
