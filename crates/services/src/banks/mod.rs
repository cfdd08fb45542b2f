//! Question-bank providers.
//!
//! A bank turns some external source into a pool of validated questions for
//! a [`QuestionFilter`]. Entries that fail normalization are skipped with a
//! warning instead of failing the whole load.

mod filter;
mod local;
mod opensat;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use prep_core::model::Question;
use prep_core::normalize::RawQuestion;

use crate::error::QuestionBankError;

pub use filter::{ANY_ASSESSMENT, QuestionFilter, Subject};
pub use local::LocalJsonBank;
pub use opensat::{DEFAULT_OPENSAT_URL, OpenSatBank};

/// Source of practice questions.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Load every question matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::Empty` if nothing matches, or a source
    /// specific error if the bank cannot be read.
    async fn load(&self, filter: &QuestionFilter) -> Result<Vec<Question>, QuestionBankError>;
}

/// Bank document: either a flat list or per-subject sections.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BankDocument {
    List(Vec<Value>),
    Sections {
        #[serde(default)]
        math: Vec<Value>,
        #[serde(default)]
        english: Vec<Value>,
    },
}

impl BankDocument {
    /// Entries for `subject`, or all entries when no subject is set.
    pub(crate) fn into_entries(self, subject: Option<Subject>) -> Vec<Value> {
        match self {
            BankDocument::List(entries) => entries,
            BankDocument::Sections { math, english } => match subject {
                Some(Subject::Math) => math,
                Some(Subject::English) => english,
                None => math.into_iter().chain(english).collect(),
            },
        }
    }
}

/// Normalize, filter and de-duplicate raw bank entries.
pub(crate) fn collect_questions(
    source: &str,
    entries: Vec<Value>,
    filter: &QuestionFilter,
) -> Result<Vec<Question>, QuestionBankError> {
    let total = entries.len();
    let mut seen = HashSet::new();
    let mut questions = Vec::new();

    for (position, entry) in entries.into_iter().enumerate() {
        let question = match serde_json::from_value::<RawQuestion>(entry)
            .map_err(|err| err.to_string())
            .and_then(|raw| raw.normalize().map_err(|err| err.to_string()))
        {
            Ok(question) => question,
            Err(reason) => {
                warn!(source, position, %reason, "skipping malformed question");
                continue;
            }
        };

        if !filter.matches(&question) {
            continue;
        }
        if !seen.insert(question.id().clone()) {
            warn!(source, position, id = %question.id(), "skipping duplicate question id");
            continue;
        }
        questions.push(question);
    }

    debug!(source, total, kept = questions.len(), "loaded question bank");
    if questions.is_empty() {
        return Err(QuestionBankError::Empty);
    }
    Ok(questions)
}
