//! Fraud assessment pipeline
//!
//! Gathers the four signals for a transaction, aggregates them, and always
//! hands back a verdict. Signal failures degrade individual inputs; anything
//! that escapes that (aggregation errors, panics) collapses to the
//! conservative default.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::inference::{
    AnomalyInference, ComplianceInference, GeminiClient, HuggingFaceClient, InsightInference,
    SequenceInference,
};
use crate::scoring::{Aggregator, FraudAssessment, SignalSet};
use crate::signals::{
    AnomalyScorer, ComplianceChecker, InsightGenerator, SequenceAnalyzer, SignalRequest, SignalResult,
    SignalRunner, SignalSource,
};
use crate::transaction::{Transaction, TransactionHistory};

/// Lifecycle of a single assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStage {
    Pending,
    SignalsGathering,
    Aggregating,
    Classified,
}

impl AssessmentStage {
    /// Move to `next`; stages only go forward
    pub fn advance(self, next: AssessmentStage) -> Result<AssessmentStage> {
        if next <= self {
            return Err(Error::Internal(format!(
                "Invalid stage transition {} -> {}",
                self, next
            )));
        }
        debug!(from = %self, to = %next, "Assessment stage");
        Ok(next)
    }
}

impl fmt::Display for AssessmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssessmentStage::Pending => "pending",
            AssessmentStage::SignalsGathering => "signals_gathering",
            AssessmentStage::Aggregating => "aggregating",
            AssessmentStage::Classified => "classified",
        };
        f.write_str(name)
    }
}

/// Produces a [`FraudAssessment`] for every transaction it is given
pub struct FraudOrchestrator {
    anomaly: AnomalyScorer,
    sequence: SequenceAnalyzer,
    compliance: ComplianceChecker,
    insight: InsightGenerator,
    runner: SignalRunner,
    aggregator: Aggregator,
    sequential: bool,
}

impl FraudOrchestrator {
    pub fn new(
        anomaly: Arc<dyn AnomalyInference>,
        sequence: Arc<dyn SequenceInference>,
        compliance: Arc<dyn ComplianceInference>,
        insight: Arc<dyn InsightInference>,
        runner: SignalRunner,
    ) -> Self {
        Self {
            anomaly: AnomalyScorer::new(anomaly),
            sequence: SequenceAnalyzer::new(sequence),
            compliance: ComplianceChecker::new(compliance),
            insight: InsightGenerator::new(insight),
            runner,
            aggregator: Aggregator::new(),
            sequential: false,
        }
    }

    /// Query sources one after another instead of concurrently
    pub fn with_sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    /// Wire the Hugging Face and Gemini clients from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let huggingface = Arc::new(HuggingFaceClient::new(&config.huggingface)?);
        let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
        let runner = SignalRunner::new(config.retry, config.orchestrator.call_timeout());

        Ok(Self::new(
            huggingface.clone(),
            huggingface,
            gemini.clone(),
            gemini,
            runner,
        )
        .with_sequential(config.orchestrator.sequential))
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    /// Assess a transaction against the sender's recent history.
    ///
    /// Never fails: provider outages degrade individual signals, and any
    /// internal defect yields [`FraudAssessment::conservative_default`].
    pub async fn assess(&self, transaction: &Transaction, history: &TransactionHistory) -> FraudAssessment {
        let outcome = AssertUnwindSafe(self.run(transaction, history))
            .catch_unwind()
            .await;

        let assessment = match outcome {
            Ok(Ok(assessment)) => assessment,
            Ok(Err(e)) => {
                error!(error = %e, "Fraud assessment failed, returning conservative default");
                FraudAssessment::conservative_default()
            }
            Err(panic) => {
                error!(
                    panic = %panic_message(panic.as_ref()),
                    "Fraud assessment panicked, returning conservative default"
                );
                FraudAssessment::conservative_default()
            }
        };

        info!(
            assessment_id = %assessment.assessment_id,
            sender = %transaction.sender,
            fraud_score = assessment.fraud_score,
            is_fraudulent = assessment.is_fraudulent,
            degraded = assessment.is_degraded(),
            "Transaction assessed"
        );

        assessment
    }

    async fn run(&self, transaction: &Transaction, history: &TransactionHistory) -> Result<FraudAssessment> {
        let stage = AssessmentStage::Pending.advance(AssessmentStage::SignalsGathering)?;
        let request = SignalRequest::new(transaction, history);
        let signals = self.gather(&request).await;

        let stage = stage.advance(AssessmentStage::Aggregating)?;
        let assessment = self.aggregator.aggregate(&signals)?;

        stage.advance(AssessmentStage::Classified)?;
        Ok(assessment)
    }

    async fn gather(&self, request: &SignalRequest<'_>) -> SignalSet {
        if self.sequential {
            SignalSet {
                anomaly: self.score(&self.anomaly, request).await,
                sequence: self.score(&self.sequence, request).await,
                compliance: self.score(&self.compliance, request).await,
                insight: self.score(&self.insight, request).await,
            }
        } else {
            let (anomaly, sequence, compliance, insight) = tokio::join!(
                self.score(&self.anomaly, request),
                self.score(&self.sequence, request),
                self.score(&self.compliance, request),
                self.score(&self.insight, request),
            );
            SignalSet {
                anomaly,
                sequence,
                compliance,
                insight,
            }
        }
    }

    async fn score(&self, source: &dyn SignalSource, request: &SignalRequest<'_>) -> SignalResult {
        self.runner.score(source, request).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::scoring::{Provenance, FAILED_REASON, LEGITIMATE_REASON};
    use crate::signals::SignalKind;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Answers every capability with fixed values
    struct Fixed {
        anomaly: f64,
        sequence: f64,
        compliance: &'static str,
        insight: &'static str,
    }

    #[async_trait]
    impl AnomalyInference for Fixed {
        async fn suspicious_probability(&self, _transaction: &Transaction) -> Result<f64> {
            Ok(self.anomaly)
        }
    }

    #[async_trait]
    impl SequenceInference for Fixed {
        async fn negative_sentiment_probability(&self, _sequence: &str) -> Result<f64> {
            Ok(self.sequence)
        }
    }

    #[async_trait]
    impl ComplianceInference for Fixed {
        async fn compliance_verdict(&self, _transaction: &Transaction) -> Result<String> {
            Ok(self.compliance.to_string())
        }
    }

    #[async_trait]
    impl InsightInference for Fixed {
        async fn fraud_insight(&self, _transaction: &Transaction) -> Result<String> {
            Ok(self.insight.to_string())
        }
    }

    /// Fails every capability with a retryable error
    #[derive(Default)]
    struct Down {
        calls: AtomicU32,
    }

    impl Down {
        fn fail<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl AnomalyInference for Down {
        async fn suspicious_probability(&self, _transaction: &Transaction) -> Result<f64> {
            self.fail()
        }
    }

    #[async_trait]
    impl SequenceInference for Down {
        async fn negative_sentiment_probability(&self, _sequence: &str) -> Result<f64> {
            self.fail()
        }
    }

    #[async_trait]
    impl ComplianceInference for Down {
        async fn compliance_verdict(&self, _transaction: &Transaction) -> Result<String> {
            self.fail()
        }
    }

    #[async_trait]
    impl InsightInference for Down {
        async fn fraud_insight(&self, _transaction: &Transaction) -> Result<String> {
            self.fail()
        }
    }

    struct Exploding;

    #[async_trait]
    impl InsightInference for Exploding {
        async fn fraud_insight(&self, _transaction: &Transaction) -> Result<String> {
            panic!("insight provider exploded");
        }
    }

    fn runner() -> SignalRunner {
        SignalRunner::new(
            RetryPolicy::new(3, Duration::from_millis(1)),
            Duration::from_millis(200),
        )
    }

    fn suspicious() -> Arc<Fixed> {
        Arc::new(Fixed {
            anomaly: 0.9,
            sequence: 0.8,
            compliance: "Complies with RBI regulations.",
            insight: "Unusual amount for this sender.",
        })
    }

    fn transaction() -> Transaction {
        Transaction::new("alice", "bob", Decimal::new(9_500_000, 2), "UPI")
            .with_network("203.0.113.9", "curl/8.0")
    }

    #[tokio::test]
    async fn test_live_fraudulent_verdict() {
        let fixed = suspicious();
        let orchestrator =
            FraudOrchestrator::new(fixed.clone(), fixed.clone(), fixed.clone(), fixed, runner());

        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;

        assert!(assessment.is_fraudulent);
        assert!((assessment.fraud_score - 0.84).abs() < 1e-9);
        assert!(assessment.fraud_reasons.starts_with("Unusual amount for this sender."));
        assert_eq!(assessment.compliance_status, "Complies with RBI regulations.");
        assert_eq!(assessment.provenance, Provenance::Live);
    }

    #[tokio::test]
    async fn test_total_outage_is_neutral() {
        let down = Arc::new(Down::default());
        let orchestrator =
            FraudOrchestrator::new(down.clone(), down.clone(), down.clone(), down.clone(), runner());

        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;

        assert!(!assessment.is_fraudulent);
        assert!((assessment.fraud_score - 0.5).abs() < 1e-9);
        assert_eq!(assessment.fraud_reasons, LEGITIMATE_REASON);
        assert_eq!(
            assessment.compliance_status,
            "Unable to verify compliance due to an error."
        );
        // Four signals, three attempts each
        assert_eq!(down.calls.load(Ordering::SeqCst), 12);
        match assessment.provenance {
            Provenance::Degraded { signals } => assert_eq!(signals.len(), 4),
            other => panic!("unexpected provenance: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_anomaly_outage_uses_neutral_anomaly() {
        let fixed = Arc::new(Fixed {
            anomaly: 0.0,
            sequence: 1.0,
            compliance: "Complies.",
            insight: "Repeated failed attempts.",
        });
        let orchestrator = FraudOrchestrator::new(
            Arc::new(Down::default()),
            fixed.clone(),
            fixed.clone(),
            fixed,
            runner(),
        );

        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;

        assert_eq!(assessment.anomaly_score, 0.5);
        assert!((assessment.fraud_score - 0.8).abs() < 1e-9);
        assert!(assessment.is_fraudulent);
        assert!(assessment.fraud_reasons.contains("Anomaly Score: 0.50"));
        assert_eq!(
            assessment.provenance,
            Provenance::Degraded {
                signals: vec![SignalKind::Anomaly]
            }
        );
    }

    #[tokio::test]
    async fn test_panic_yields_conservative_default() {
        let fixed = suspicious();
        let orchestrator = FraudOrchestrator::new(
            fixed.clone(),
            fixed.clone(),
            fixed,
            Arc::new(Exploding),
            runner(),
        );

        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;

        assert!(!assessment.is_fraudulent);
        assert_eq!(assessment.fraud_score, 0.5);
        assert_eq!(assessment.fraud_reasons, FAILED_REASON);
        assert_eq!(assessment.compliance_status, "Unknown");
        assert_eq!(assessment.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent() {
        let fixed = suspicious();
        let concurrent = FraudOrchestrator::new(
            fixed.clone(),
            fixed.clone(),
            fixed.clone(),
            fixed.clone(),
            runner(),
        );
        let sequential =
            FraudOrchestrator::new(fixed.clone(), fixed.clone(), fixed.clone(), fixed, runner())
                .with_sequential(true);
        assert!(sequential.is_sequential());

        let tx = transaction();
        let history = TransactionHistory::empty();
        let a = concurrent.assess(&tx, &history).await;
        let b = sequential.assess(&tx, &history).await;

        assert_eq!(a.is_fraudulent, b.is_fraudulent);
        assert_eq!(a.fraud_score, b.fraud_score);
        assert_eq!(a.fraud_reasons, b.fraud_reasons);
    }

    #[tokio::test]
    async fn test_from_config_without_keys_degrades() {
        let mut config = Config::default();
        config.retry = RetryPolicy::new(1, Duration::from_millis(1));
        let orchestrator = FraudOrchestrator::from_config(&config).unwrap();

        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;

        assert!(!assessment.is_fraudulent);
        assert_eq!(assessment.fraud_score, 0.5);
        assert!(assessment.is_degraded());
    }

    const PROVIDER_DELAY: Duration = Duration::from_millis(300);

    /// Answers every capability after a fixed delay
    struct Slow;

    #[async_trait]
    impl AnomalyInference for Slow {
        async fn suspicious_probability(&self, _transaction: &Transaction) -> Result<f64> {
            tokio::time::sleep(PROVIDER_DELAY).await;
            Ok(0.2)
        }
    }

    #[async_trait]
    impl SequenceInference for Slow {
        async fn negative_sentiment_probability(&self, _sequence: &str) -> Result<f64> {
            tokio::time::sleep(PROVIDER_DELAY).await;
            Ok(0.3)
        }
    }

    #[async_trait]
    impl ComplianceInference for Slow {
        async fn compliance_verdict(&self, _transaction: &Transaction) -> Result<String> {
            tokio::time::sleep(PROVIDER_DELAY).await;
            Ok("Complies.".to_string())
        }
    }

    #[async_trait]
    impl InsightInference for Slow {
        async fn fraud_insight(&self, _transaction: &Transaction) -> Result<String> {
            tokio::time::sleep(PROVIDER_DELAY).await;
            Ok("Nothing unusual.".to_string())
        }
    }

    fn slow_orchestrator() -> FraudOrchestrator {
        let slow = Arc::new(Slow);
        FraudOrchestrator::new(
            slow.clone(),
            slow.clone(),
            slow.clone(),
            slow,
            SignalRunner::new(RetryPolicy::default(), Duration::from_secs(10)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_fan_out_concurrently() {
        let orchestrator = slow_orchestrator();

        let start = tokio::time::Instant::now();
        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;
        let elapsed = start.elapsed();

        assert_eq!(assessment.provenance, Provenance::Live);
        // Bounded by the slowest signal, not the sum of all four
        assert!(elapsed >= PROVIDER_DELAY);
        assert!(elapsed < PROVIDER_DELAY * 2, "took {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_mode_awaits_each_signal() {
        let orchestrator = slow_orchestrator().with_sequential(true);

        let start = tokio::time::Instant::now();
        let assessment = orchestrator
            .assess(&transaction(), &TransactionHistory::empty())
            .await;

        assert_eq!(assessment.provenance, Provenance::Live);
        assert!(start.elapsed() >= PROVIDER_DELAY * 4);
    }

    #[test]
    fn test_stages_only_move_forward() {
        let stage = AssessmentStage::Pending
            .advance(AssessmentStage::SignalsGathering)
            .unwrap();
        assert!(stage.advance(AssessmentStage::Pending).is_err());
        assert!(stage.advance(AssessmentStage::SignalsGathering).is_err());
        assert_eq!(
            stage.advance(AssessmentStage::Aggregating).unwrap(),
            AssessmentStage::Aggregating
        );
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
