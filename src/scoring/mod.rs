//! Aggregation of settled signals into a fraud verdict
//!
//! The numeric signals are blended into a single fraud score; the compliance
//! narrative can force a fraudulent verdict on its own. The two text signals
//! never influence the score, they only shape the explanation.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::signals::{SignalKind, SignalResult};

/// Weight of the single-transaction anomaly probability
pub const ANOMALY_WEIGHT: f64 = 0.4;

/// Weight of the sequence negativity probability
pub const SEQUENCE_WEIGHT: f64 = 0.6;

/// Scores strictly above this are fraudulent
pub const FRAUD_SCORE_THRESHOLD: f64 = 0.7;

/// Case-insensitive substring that marks a compliance violation
pub const COMPLIANCE_VIOLATION_MARKER: &str = "violate";

pub const LEGITIMATE_REASON: &str = "Transaction appears legitimate based on AI analysis.";

pub const FAILED_REASON: &str = "Fraud detection failed due to an error.";

pub const UNKNOWN_COMPLIANCE: &str = "Unknown";

/// Neutral score reported when no verdict could be produced
pub const DEFAULT_FRAUD_SCORE: f64 = 0.5;

/// How much of the verdict is backed by live provider responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Provenance {
    /// Every signal came from a live response
    Live,
    /// Listed signals were replaced by their fallback constants
    Degraded { signals: Vec<SignalKind> },
    /// The pipeline failed and the conservative default was returned
    Fallback,
}

/// Verdict returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAssessment {
    pub is_fraudulent: bool,
    /// Weighted blend of the numeric signals, in [0, 1]
    pub fraud_score: f64,
    pub fraud_reasons: String,
    /// Raw compliance narrative
    pub compliance_status: String,
    pub anomaly_score: f64,
    pub sequence_score: f64,
    pub provenance: Provenance,
    pub assessment_id: Uuid,
    pub assessed_at: DateTime<Utc>,
}

impl FraudAssessment {
    /// Non-fraudulent, neutral verdict used when scoring itself fails
    pub fn conservative_default() -> Self {
        Self {
            is_fraudulent: false,
            fraud_score: DEFAULT_FRAUD_SCORE,
            fraud_reasons: FAILED_REASON.to_string(),
            compliance_status: UNKNOWN_COMPLIANCE.to_string(),
            anomaly_score: DEFAULT_FRAUD_SCORE,
            sequence_score: DEFAULT_FRAUD_SCORE,
            provenance: Provenance::Fallback,
            assessment_id: Uuid::new_v4(),
            assessed_at: Utc::now(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self.provenance, Provenance::Live)
    }
}

/// The four settled signals of one assessment
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub anomaly: SignalResult,
    pub sequence: SignalResult,
    pub compliance: SignalResult,
    pub insight: SignalResult,
}

impl SignalSet {
    pub fn iter(&self) -> impl Iterator<Item = &SignalResult> {
        [&self.anomaly, &self.sequence, &self.compliance, &self.insight].into_iter()
    }

    pub fn provenance(&self) -> Provenance {
        let degraded: Vec<SignalKind> = self
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.kind)
            .collect();

        if degraded.is_empty() {
            Provenance::Live
        } else {
            Provenance::Degraded { signals: degraded }
        }
    }
}

/// Pure verdict over already-settled signal values
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_fraudulent: bool,
    pub fraud_score: f64,
    pub fraud_reasons: String,
}

/// Combines signals into a [`FraudAssessment`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, signals: &SignalSet) -> Result<FraudAssessment> {
        let anomaly = signals.anomaly.score();
        let sequence = signals.sequence.score();
        let compliance = signals.compliance.text();
        let insight = signals.insight.text();

        let verdict = self.verdict(anomaly, sequence, &compliance, &insight)?;

        Ok(FraudAssessment {
            is_fraudulent: verdict.is_fraudulent,
            fraud_score: verdict.fraud_score,
            fraud_reasons: verdict.fraud_reasons,
            compliance_status: compliance,
            anomaly_score: anomaly,
            sequence_score: sequence,
            provenance: signals.provenance(),
            assessment_id: Uuid::new_v4(),
            assessed_at: Utc::now(),
        })
    }

    /// Score, classify and explain
    pub fn verdict(&self, anomaly: f64, sequence: f64, compliance: &str, insight: &str) -> Result<Verdict> {
        let fraud_score = weighted_score(anomaly, sequence)?;
        let is_fraudulent = is_fraudulent(fraud_score, compliance);

        let fraud_reasons = if is_fraudulent {
            format!(
                "{}\nAnomaly Score: {}\nSequence Score: {}\nCompliance: {}",
                insight,
                two_decimals(anomaly),
                two_decimals(sequence),
                compliance
            )
        } else {
            LEGITIMATE_REASON.to_string()
        };

        Ok(Verdict {
            is_fraudulent,
            fraud_score,
            fraud_reasons,
        })
    }
}

/// `anomaly * 0.4 + sequence * 0.6`; inputs must be probabilities
pub fn weighted_score(anomaly: f64, sequence: f64) -> Result<f64> {
    check_probability("anomaly", anomaly)?;
    check_probability("sequence", sequence)?;
    Ok((anomaly * ANOMALY_WEIGHT + sequence * SEQUENCE_WEIGHT).clamp(0.0, 1.0))
}

pub fn is_fraudulent(fraud_score: f64, compliance: &str) -> bool {
    fraud_score > FRAUD_SCORE_THRESHOLD || violates_compliance(compliance)
}

pub fn violates_compliance(compliance: &str) -> bool {
    compliance
        .to_lowercase()
        .contains(COMPLIANCE_VIOLATION_MARKER)
}

/// Two decimal places with ties rounded away from zero (0.125 -> "0.13")
pub fn two_decimals(value: f64) -> String {
    match Decimal::from_f64(value) {
        Some(d) => format!(
            "{:.2}",
            d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => format!("{:.2}", value),
    }
}

fn check_probability(component: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidScore { component, value })
    }
}
