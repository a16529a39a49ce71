//! External inference capabilities consumed by the signal sources
//!
//! The scoring core only depends on these traits. Concrete HTTP clients for
//! Hugging Face and Gemini live in the submodules; tests substitute fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::transaction::Transaction;

pub mod gemini;
pub mod http;
pub mod huggingface;

pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceClient;

/// Classifies a single transaction as normal or suspicious
#[async_trait]
pub trait AnomalyInference: Send + Sync {
    /// Probability of the "suspicious" label
    async fn suspicious_probability(&self, transaction: &Transaction) -> Result<f64>;
}

/// Scores the serialized history-plus-current sequence
#[async_trait]
pub trait SequenceInference: Send + Sync {
    /// Probability of negative sentiment, used as a fraud-likelihood proxy
    async fn negative_sentiment_probability(&self, sequence: &str) -> Result<f64>;
}

/// Produces a natural-language regulatory compliance verdict
#[async_trait]
pub trait ComplianceInference: Send + Sync {
    async fn compliance_verdict(&self, transaction: &Transaction) -> Result<String>;
}

/// Produces a natural-language fraud risk narrative
#[async_trait]
pub trait InsightInference: Send + Sync {
    async fn fraud_insight(&self, transaction: &Transaction) -> Result<String>;
}
