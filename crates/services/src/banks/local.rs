use std::path::PathBuf;

use async_trait::async_trait;

use prep_core::model::Question;

use super::{BankDocument, QuestionBank, QuestionFilter, collect_questions};
use crate::error::QuestionBankError;

/// Question bank stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct LocalJsonBank {
    path: PathBuf,
}

impl LocalJsonBank {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionBank for LocalJsonBank {
    async fn load(&self, filter: &QuestionFilter) -> Result<Vec<Question>, QuestionBankError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| QuestionBankError::Io {
                path: self.path.clone(),
                source,
            })?;
        let document: BankDocument = serde_json::from_slice(&bytes)?;
        let source = self.path.display().to_string();
        collect_questions(&source, document.into_entries(filter.subject), filter)
    }
}
