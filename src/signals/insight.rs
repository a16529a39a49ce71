//! Free-form fraud risk narrative

use std::sync::Arc;

use async_trait::async_trait;

use super::{SignalKind, SignalRequest, SignalSource, SignalValue, INSIGHT_FALLBACK_TEXT};
use crate::error::Result;
use crate::inference::InsightInference;

pub struct InsightGenerator {
    inference: Arc<dyn InsightInference>,
}

impl InsightGenerator {
    pub fn new(inference: Arc<dyn InsightInference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl SignalSource for InsightGenerator {
    fn kind(&self) -> SignalKind {
        SignalKind::Insight
    }

    fn fallback(&self) -> SignalValue {
        SignalValue::Text(INSIGHT_FALLBACK_TEXT.to_string())
    }

    async fn fetch(&self, request: &SignalRequest<'_>) -> Result<SignalValue> {
        let insight = self.inference.fraud_insight(request.transaction).await?;
        Ok(SignalValue::Text(insight))
    }
}
