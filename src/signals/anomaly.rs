//! Single-transaction anomaly signal

use std::sync::Arc;

use async_trait::async_trait;

use super::{SignalKind, SignalRequest, SignalSource, SignalValue, ANOMALY_FALLBACK_SCORE};
use crate::error::Result;
use crate::inference::AnomalyInference;

/// Scores how suspicious the transaction looks on its own
pub struct AnomalyScorer {
    inference: Arc<dyn AnomalyInference>,
}

impl AnomalyScorer {
    pub fn new(inference: Arc<dyn AnomalyInference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl SignalSource for AnomalyScorer {
    fn kind(&self) -> SignalKind {
        SignalKind::Anomaly
    }

    fn fallback(&self) -> SignalValue {
        SignalValue::Numeric(ANOMALY_FALLBACK_SCORE)
    }

    async fn fetch(&self, request: &SignalRequest<'_>) -> Result<SignalValue> {
        let probability = self
            .inference
            .suspicious_probability(request.transaction)
            .await?;
        Ok(SignalValue::Numeric(probability))
    }
}
