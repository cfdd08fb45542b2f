use async_trait::async_trait;
use reqwest::Client;

use prep_core::model::Question;

use super::{BankDocument, QuestionBank, QuestionFilter, collect_questions};
use crate::error::QuestionBankError;

/// Public mirror of the OpenSAT question set.
pub const DEFAULT_OPENSAT_URL: &str =
    "https://api.jsonsilo.com/public/942c3c3b-3a0c-4be3-81c2-12029def19f5";

/// Question bank fetched over HTTP in the OpenSAT `{math, english}` layout.
#[derive(Clone)]
pub struct OpenSatBank {
    client: Client,
    url: String,
}

impl OpenSatBank {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Bank pointed at `PREP_OPENSAT_URL`, or the public mirror.
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var("PREP_OPENSAT_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENSAT_URL.to_owned());
        Self::new(url)
    }
}

impl Default for OpenSatBank {
    fn default() -> Self {
        Self::new(DEFAULT_OPENSAT_URL)
    }
}

#[async_trait]
impl QuestionBank for OpenSatBank {
    async fn load(&self, filter: &QuestionFilter) -> Result<Vec<Question>, QuestionBankError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(QuestionBankError::HttpStatus(response.status()));
        }

        let document: BankDocument = response.json().await?;
        collect_questions(&self.url, document.into_entries(filter.subject), filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banks::Subject;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(status: u16, body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    fn bank(server: &MockServer) -> OpenSatBank {
        OpenSatBank::new(format!("{}/questions", server.uri()))
    }

    fn entry(id: &str, domain: &str) -> serde_json::Value {
        json!({
            "id": id,
            "domain": domain,
            "difficulty": "M",
            "question": {
                "question": "Pick B.",
                "choices": {"A": "no", "B": "yes", "C": "maybe"},
                "correct_answer": "B"
            }
        })
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = serve(503, json!({"error": "maintenance"})).await;
        let err = bank(&server).load(&QuestionFilter::new()).await.unwrap_err();
        assert!(matches!(
            err,
            QuestionBankError::HttpStatus(status) if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn subject_picks_its_section() {
        let server = serve(
            200,
            json!({
                "math": [entry("m1", "Algebra"), entry("m2", "Advanced Math")],
                "english": [entry("e1", "Craft and Structure")]
            }),
        )
        .await;
        let bank = bank(&server);

        let english = bank
            .load(&QuestionFilter::new().with_subject(Subject::English))
            .await
            .unwrap();
        assert_eq!(english.len(), 1);
        assert_eq!(english[0].id().as_str(), "e1");
        assert_eq!(english[0].correct_index(), 1);

        let everything = bank.load(&QuestionFilter::new()).await.unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn malformed_remote_entries_are_skipped() {
        let server = serve(
            200,
            json!({
                "math": [
                    entry("m1", "Algebra"),
                    {"id": "m2", "domain": "Algebra", "question": {"choices": {}, "correct_answer": "A"}},
                    "garbage"
                ],
                "english": []
            }),
        )
        .await;
        let questions = bank(&server)
            .load(&QuestionFilter::new().with_subject(Subject::Math))
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].skill().as_str(), "Algebra");
    }
}
