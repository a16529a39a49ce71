//! Hugging Face Inference API client
//!
//! Serves the anomaly signal through a zero-shot classifier and the sequence
//! signal through a sentiment classifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{build_client, check_status};
use super::{AnomalyInference, SequenceInference};
use crate::config::HuggingFaceConfig;
use crate::error::{Error, Result};
use crate::transaction::Transaction;

const PROVIDER: &str = "huggingface";

const NORMAL_LABEL: &str = "normal";
const SUSPICIOUS_LABEL: &str = "suspicious";
const NEGATIVE_LABEL: &str = "NEGATIVE";

/// Hugging Face hosted inference client
pub struct HuggingFaceClient {
    client: Client,
    base_url: String,
    api_key: String,
    anomaly_model: String,
    sequence_model: String,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: [&'a str; 2],
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LabelScore {
    label: String,
    score: f64,
}

/// Zero-shot responses come back column-wise, newer routers return rows
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f64> },
    Rows(Vec<LabelScore>),
}

/// Text classification is nested per input, or flat for a single input
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl HuggingFaceClient {
    pub fn new(config: &HuggingFaceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_millis(config.timeout_ms))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            anomaly_model: config.anomaly_model.clone(),
            sequence_model: config.sequence_model.clone(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    async fn post<B, T>(&self, model: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: for<'de> Deserialize<'de>,
    {
        if self.api_key.is_empty() {
            return Err(Error::MissingApiKey(PROVIDER));
        }

        let url = self.model_url(model);
        debug!(model, "Querying Hugging Face inference");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        check_status(PROVIDER, response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::malformed(PROVIDER, e.to_string()))
    }
}

#[async_trait]
impl AnomalyInference for HuggingFaceClient {
    async fn suspicious_probability(&self, transaction: &Transaction) -> Result<f64> {
        let inputs = transaction.anomaly_text();
        let request = ZeroShotRequest {
            inputs: &inputs,
            parameters: ZeroShotParameters {
                candidate_labels: [NORMAL_LABEL, SUSPICIOUS_LABEL],
            },
        };

        let response: ZeroShotResponse = self.post(&self.anomaly_model, &request).await?;
        suspicious_score(response)
    }
}

#[async_trait]
impl SequenceInference for HuggingFaceClient {
    async fn negative_sentiment_probability(&self, sequence: &str) -> Result<f64> {
        let request = TextRequest { inputs: sequence };
        let response: ClassificationResponse = self.post(&self.sequence_model, &request).await?;
        negative_score(response)
    }
}

/// Probability attached to the "suspicious" label
pub(crate) fn suspicious_score(response: ZeroShotResponse) -> Result<f64> {
    let score = match response {
        ZeroShotResponse::Columns { labels, scores } => {
            if labels.len() != scores.len() {
                return Err(Error::malformed(
                    PROVIDER,
                    format!("{} labels but {} scores", labels.len(), scores.len()),
                ));
            }
            labels
                .iter()
                .position(|l| l.eq_ignore_ascii_case(SUSPICIOUS_LABEL))
                .map(|i| scores[i])
        }
        ZeroShotResponse::Rows(rows) => find_label(&rows, SUSPICIOUS_LABEL),
    };

    score.ok_or_else(|| Error::malformed(PROVIDER, "no suspicious label in response"))
}

/// Probability attached to the NEGATIVE sentiment label
pub(crate) fn negative_score(response: ClassificationResponse) -> Result<f64> {
    let score = match response {
        ClassificationResponse::Nested(batches) => batches
            .first()
            .and_then(|rows| find_label(rows, NEGATIVE_LABEL)),
        ClassificationResponse::Flat(rows) => find_label(&rows, NEGATIVE_LABEL),
    };

    score.ok_or_else(|| Error::malformed(PROVIDER, "no NEGATIVE label in response"))
}

fn find_label(rows: &[LabelScore], label: &str) -> Option<f64> {
    rows.iter()
        .find(|r| r.label.eq_ignore_ascii_case(label))
        .map(|r| r.score)
}
