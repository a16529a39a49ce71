//! Regulatory compliance narrative

use std::sync::Arc;

use async_trait::async_trait;

use super::{SignalKind, SignalRequest, SignalSource, SignalValue, COMPLIANCE_FALLBACK_TEXT};
use crate::error::Result;
use crate::inference::ComplianceInference;

pub struct ComplianceChecker {
    inference: Arc<dyn ComplianceInference>,
}

impl ComplianceChecker {
    pub fn new(inference: Arc<dyn ComplianceInference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl SignalSource for ComplianceChecker {
    fn kind(&self) -> SignalKind {
        SignalKind::Compliance
    }

    fn fallback(&self) -> SignalValue {
        SignalValue::Text(COMPLIANCE_FALLBACK_TEXT.to_string())
    }

    async fn fetch(&self, request: &SignalRequest<'_>) -> Result<SignalValue> {
        let verdict = self.inference.compliance_verdict(request.transaction).await?;
        Ok(SignalValue::Text(verdict))
    }
}
