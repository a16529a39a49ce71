//! Signal sources feeding the fraud verdict
//!
//! Each source wraps one external inference capability. Sources only perform
//! a single attempt; the [`SignalRunner`] owns retry, per-attempt timeout and
//! the fallback substitution so that discipline lives in one place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transaction::{Transaction, TransactionHistory};

pub mod anomaly;
pub mod compliance;
pub mod insight;
pub mod runner;
pub mod sequence;

pub use anomaly::AnomalyScorer;
pub use compliance::ComplianceChecker;
pub use insight::InsightGenerator;
pub use runner::SignalRunner;
pub use sequence::SequenceAnalyzer;

/// Neutral anomaly probability used when the classifier cannot be reached
pub const ANOMALY_FALLBACK_SCORE: f64 = 0.5;

/// Neutral sequence probability used when the classifier cannot be reached
pub const SEQUENCE_FALLBACK_SCORE: f64 = 0.5;

pub const COMPLIANCE_FALLBACK_TEXT: &str = "Unable to verify compliance due to an error.";

pub const INSIGHT_FALLBACK_TEXT: &str = "Unable to generate insights due to an error.";

/// The four signal sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Single-transaction suspicious/normal classification
    Anomaly,
    /// Negativity of the sender's recent transaction sequence
    Sequence,
    /// Regulatory compliance narrative
    Compliance,
    /// Free-form fraud risk narrative
    Insight,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Anomaly => "anomaly",
            SignalKind::Sequence => "sequence",
            SignalKind::Compliance => "compliance",
            SignalKind::Insight => "insight",
        }
    }

    /// Numeric sources yield a probability, the others yield text
    pub fn is_numeric(&self) -> bool {
        matches!(self, SignalKind::Anomaly | SignalKind::Sequence)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload produced by a signal source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalValue {
    /// Probability in [0, 1]
    Numeric(f64),
    Text(String),
}

impl SignalValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            SignalValue::Numeric(v) => Some(*v),
            SignalValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SignalValue::Numeric(_) => None,
            SignalValue::Text(t) => Some(t),
        }
    }

    /// Check the payload shape against the source kind and clamp probabilities.
    ///
    /// Non-finite probabilities are rejected rather than clamped.
    pub fn validate_for(self, kind: SignalKind) -> Result<Self> {
        match (kind.is_numeric(), self) {
            (true, SignalValue::Numeric(v)) if v.is_finite() => {
                Ok(SignalValue::Numeric(v.clamp(0.0, 1.0)))
            }
            (true, SignalValue::Numeric(v)) => Err(Error::malformed(
                kind.as_str(),
                format!("non-finite probability {}", v),
            )),
            (false, SignalValue::Text(t)) => Ok(SignalValue::Text(t)),
            (_, other) => Err(Error::malformed(
                kind.as_str(),
                format!("unexpected payload {:?}", other),
            )),
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Numeric(v) => write!(f, "{:.2}", v),
            SignalValue::Text(t) => f.write_str(t),
        }
    }
}

/// A settled signal, either live or substituted by its fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResult {
    pub kind: SignalKind,
    pub value: SignalValue,
    /// True when `value` is the documented fallback rather than a live response
    pub degraded: bool,
    /// Number of provider invocations made
    pub attempts: u32,
    #[serde(with = "duration_millis")]
    pub latency: Duration,
    /// Why the live value was unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignalResult {
    pub fn live(kind: SignalKind, value: SignalValue, attempts: u32, latency: Duration) -> Self {
        Self {
            kind,
            value,
            degraded: false,
            attempts,
            latency,
            error: None,
        }
    }

    pub fn fallback(
        kind: SignalKind,
        value: SignalValue,
        attempts: u32,
        latency: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            value,
            degraded: true,
            attempts,
            latency,
            error: Some(error.into()),
        }
    }

    /// Numeric payload, or the neutral 0.5 if this is a text signal
    pub fn score(&self) -> f64 {
        self.value.as_numeric().unwrap_or(0.5)
    }

    /// Text payload, or the formatted number for numeric signals
    pub fn text(&self) -> String {
        self.value.to_string()
    }
}

/// Input shared by all sources for one assessment
#[derive(Debug, Clone, Copy)]
pub struct SignalRequest<'a> {
    pub transaction: &'a Transaction,
    pub history: &'a TransactionHistory,
}

impl<'a> SignalRequest<'a> {
    pub fn new(transaction: &'a Transaction, history: &'a TransactionHistory) -> Self {
        Self {
            transaction,
            history,
        }
    }
}

/// A single fraud-relevant measurement backed by one external capability
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Which of the four signals this source produces
    fn kind(&self) -> SignalKind;

    /// Provider name for logging
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Documented constant returned when the live call cannot succeed
    fn fallback(&self) -> SignalValue;

    /// One attempt against the external capability
    async fn fetch(&self, request: &SignalRequest<'_>) -> Result<SignalValue>;
}

/// Duration serialization in milliseconds for serde
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
