use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use prep_core::model::{Difficulty, Question, Skill};

/// Assessment tag that matches every question.
pub const ANY_ASSESSMENT: &str = "SAT";

/// Section of a bank to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Math,
    English,
}

impl Subject {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::English => "english",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "english" | "reading" | "rw" => Ok(Subject::English),
            other => Err(format!("unknown subject: {other}")),
        }
    }
}

/// Which questions a practice session may draw.
///
/// Empty sets mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub subject: Option<Subject>,
    pub skills: BTreeSet<Skill>,
    pub difficulties: BTreeSet<Difficulty>,
    pub assessment: Option<String>,
}

impl QuestionFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.insert(skill);
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulties.insert(difficulty);
        self
    }

    #[must_use]
    pub fn with_assessment(mut self, assessment: impl Into<String>) -> Self {
        self.assessment = Some(assessment.into());
        self
    }

    /// Questions without an assessment tag match any assessment, and the
    /// `SAT` assessment matches every question.
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        let skill_ok = self.skills.is_empty() || self.skills.contains(question.skill());
        let difficulty_ok =
            self.difficulties.is_empty() || self.difficulties.contains(&question.difficulty());
        let assessment_ok = match (self.assessment.as_deref(), question.assessment()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(_)) if wanted.eq_ignore_ascii_case(ANY_ASSESSMENT) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
        };
        skill_ok && difficulty_ok && assessment_ok
    }
}
