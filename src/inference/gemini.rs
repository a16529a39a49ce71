//! Gemini generateContent client for the narrative signals

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{build_client, check_status};
use super::{ComplianceInference, InsightInference};
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::transaction::Transaction;

const PROVIDER: &str = "gemini";

/// Google Gemini text generation client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    regulator: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_millis(config.timeout_ms))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            regulator: config.regulator.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send one prompt and return the generated text
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::MissingApiKey(PROVIDER));
        }

        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Querying Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: GenerateResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::malformed(PROVIDER, e.to_string()))?;

        extract_text(body)
    }

    fn compliance_prompt(&self, transaction: &Transaction) -> String {
        format!(
            "Check compliance with {} regulations for this transaction: {}. \
             Provide a concise response indicating if it complies or violates regulations, and why.",
            self.regulator,
            transaction.to_json()
        )
    }
}

fn insight_prompt(transaction: &Transaction) -> String {
    format!(
        "You are a financial fraud expert. Analyze this transaction for fraud risks, \
         considering sender details: {}",
        transaction.to_json()
    )
}

/// Concatenated text parts of the first candidate
pub(crate) fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(Error::malformed(PROVIDER, "no text in first candidate"));
    }
    Ok(text.to_string())
}

#[async_trait]
impl ComplianceInference for GeminiClient {
    async fn compliance_verdict(&self, transaction: &Transaction) -> Result<String> {
        self.generate(&self.compliance_prompt(transaction)).await
    }
}

#[async_trait]
impl InsightInference for GeminiClient {
    async fn fraud_insight(&self, transaction: &Transaction) -> Result<String> {
        self.generate(&insight_prompt(transaction)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    fn sample() -> Transaction {
        Transaction::new("alice", "bob", Decimal::new(250000, 2), "UPI")
    }

    #[test]
    fn test_extract_text() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Complies with "},{"text":"RBI norms."}]}}]}"#,
        );
        assert_eq!(extract_text(response).unwrap(), "Complies with RBI norms.");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        let err = extract_text(response).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { provider: "gemini", .. }));
    }

    #[test]
    fn test_extract_text_blank_parts() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#);
        assert!(extract_text(response).is_err());
    }

    #[test]
    fn test_compliance_prompt_names_regulator() {
        let mut config = GeminiConfig::default();
        config.regulator = "FinCEN".to_string();
        let client = GeminiClient::new(&config).unwrap();
        let prompt = client.compliance_prompt(&sample());
        assert!(prompt.starts_with("Check compliance with FinCEN regulations"));
        assert!(prompt.contains("\"sender\":\"alice\""));
        assert!(prompt.contains("complies or violates"));
    }

    #[test]
    fn test_insight_prompt_embeds_transaction() {
        let prompt = insight_prompt(&sample());
        assert!(prompt.starts_with("You are a financial fraud expert."));
        assert!(prompt.contains("\"receiver\":\"bob\""));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(&GeminiConfig::default()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_terminal() {
        let client = GeminiClient::new(&GeminiConfig::default()).unwrap();
        let err = client.fraud_insight(&sample()).await.unwrap_err();
        assert!(err.is_terminal());
    }
}
