//! Sequence signal over the sender's recent history

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::{SignalKind, SignalRequest, SignalSource, SignalValue, SEQUENCE_FALLBACK_SCORE};
use crate::error::Result;
use crate::inference::SequenceInference;

/// Scores the negativity of the prior transactions followed by the current one
pub struct SequenceAnalyzer {
    inference: Arc<dyn SequenceInference>,
}

impl SequenceAnalyzer {
    pub fn new(inference: Arc<dyn SequenceInference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl SignalSource for SequenceAnalyzer {
    fn kind(&self) -> SignalKind {
        SignalKind::Sequence
    }

    fn fallback(&self) -> SignalValue {
        SignalValue::Numeric(SEQUENCE_FALLBACK_SCORE)
    }

    async fn fetch(&self, request: &SignalRequest<'_>) -> Result<SignalValue> {
        let sequence = request.history.sequence_text(request.transaction);
        trace!(lines = request.history.len() + 1, "Sequence input prepared");

        let probability = self
            .inference
            .negative_sentiment_probability(&sequence)
            .await?;
        Ok(SignalValue::Numeric(probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{PriorTransaction, Transaction, TransactionHistory};
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    /// Records the sequence it was asked to score
    #[derive(Default)]
    struct RecordingSequence {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SequenceInference for RecordingSequence {
        async fn negative_sentiment_probability(&self, sequence: &str) -> Result<f64> {
            self.seen.lock().unwrap().push(sequence.to_string());
            Ok(0.3)
        }
    }

    #[tokio::test]
    async fn test_sequence_includes_history_then_current() {
        let inference = Arc::new(RecordingSequence::default());
        let analyzer = SequenceAnalyzer::new(inference.clone());

        let prior = Transaction::new("a", "b", Decimal::new(20, 0), "Card");
        let history = TransactionHistory::new(vec![PriorTransaction::new(prior, true)]);
        let tx = Transaction::new("a", "c", Decimal::new(900, 0), "UPI");

        let value = analyzer.fetch(&SignalRequest::new(&tx, &history)).await.unwrap();
        assert_eq!(value, SignalValue::Numeric(0.3));

        let seen = inference.seen.lock().unwrap();
        let lines: Vec<&str> = seen[0].lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Amount: 20, Method: Card, Fraud: true"));
        assert!(lines[1].starts_with("Amount: 900, Method: UPI, Sender:"));
    }

    #[tokio::test]
    async fn test_empty_history_sends_current_only() {
        let inference = Arc::new(RecordingSequence::default());
        let analyzer = SequenceAnalyzer::new(inference.clone());
        let tx = Transaction::new("a", "c", Decimal::new(5, 0), "UPI");
        let history = TransactionHistory::empty();

        analyzer.fetch(&SignalRequest::new(&tx, &history)).await.unwrap();

        let seen = inference.seen.lock().unwrap();
        assert_eq!(seen[0].lines().count(), 1);
    }
}
