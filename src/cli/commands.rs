//! CLI command implementations

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::Config;
use crate::inference::{
    AnomalyInference, ComplianceInference, GeminiClient, HuggingFaceClient, InsightInference,
    SequenceInference,
};
use crate::orchestrator::FraudOrchestrator;
use crate::transaction::{Transaction, TransactionHistory};

/// Score one transaction and print the assessment as JSON
pub async fn assess(
    config: &Config,
    transaction_path: &Path,
    history_path: Option<&Path>,
    sequential: bool,
) -> Result<()> {
    let transaction = load_transaction(transaction_path)?;
    let history = match history_path {
        Some(path) => load_history(path)?,
        None => TransactionHistory::empty(),
    };

    info!(
        sender = %transaction.sender,
        amount = %transaction.amount,
        history_len = history.len(),
        "Assessing transaction"
    );

    let orchestrator = FraudOrchestrator::from_config(config)?
        .with_sequential(sequential || config.orchestrator.sequential);

    let assessment = orchestrator.assess(&transaction, &history).await;

    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

/// Show configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Probe every provider once, without retries
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== PROVIDER HEALTH CHECK ===\n");

    let huggingface = HuggingFaceClient::new(&config.huggingface)?;
    let gemini = GeminiClient::new(&config.gemini)?;
    let probe = Transaction::new("health-check", "health-check", Decimal::ONE, "UPI");

    let mut all_healthy = true;

    print!("Hugging Face anomaly ({})... ", config.huggingface.anomaly_model);
    all_healthy &= report(timed(huggingface.suspicious_probability(&probe)).await);

    print!("Hugging Face sequence ({})... ", config.huggingface.sequence_model);
    let sequence = TransactionHistory::empty().sequence_text(&probe);
    all_healthy &= report(timed(huggingface.negative_sentiment_probability(&sequence)).await);

    print!("Gemini compliance ({})... ", config.gemini.model);
    all_healthy &= report(timed(gemini.compliance_verdict(&probe)).await);

    print!("Gemini insight ({})... ", config.gemini.model);
    all_healthy &= report(timed(gemini.fraud_insight(&probe)).await);

    println!();
    if all_healthy {
        println!("All providers healthy");
    } else {
        println!("Some providers unhealthy - affected signals will use fallback values");
    }

    Ok(())
}

async fn timed<T, F>(call: F) -> crate::error::Result<u64>
where
    F: std::future::Future<Output = crate::error::Result<T>>,
{
    let start = Instant::now();
    call.await?;
    Ok(start.elapsed().as_millis() as u64)
}

fn report(result: crate::error::Result<u64>) -> bool {
    match result {
        Ok(latency) => {
            println!("OK ({}ms)", latency);
            true
        }
        Err(e) => {
            println!("FAILED: {}", e);
            false
        }
    }
}

/// Read a transaction from a JSON file
pub fn load_transaction(path: &Path) -> Result<Transaction> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read transaction file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid transaction JSON in {}", path.display()))
}

/// Read prior transactions (most recent first) from a JSON array file
pub fn load_history(path: &Path) -> Result<TransactionHistory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read history file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid history JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_transaction() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "sender": "alice",
                "receiver": "bob",
                "amount": 1250.50,
                "paymentMethod": "UPI",
                "ipAddress": "198.51.100.4",
                "senderDetails": {{ "name": "Alice", "accountNumber": "001122" }}
            }}"#
        )
        .unwrap();

        let tx = load_transaction(file.path()).unwrap();
        assert_eq!(tx.sender, "alice");
        assert_eq!(tx.amount, Decimal::new(125050, 2));
        assert_eq!(tx.sender_details.account_number, "001122");
        assert!(tx.remarks.is_empty());
    }

    #[test]
    fn test_load_history_caps_entries() {
        let entry = r#"{"sender":"a","receiver":"b","amount":"10","paymentMethod":"UPI","isFraudulent":true}"#;
        let body = format!("[{}]", vec![entry; 12].join(","));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();

        let history = load_history(file.path()).unwrap();
        assert_eq!(history.len(), 10);
        assert!(history.entries()[0].is_fraudulent);
    }

    #[test]
    fn test_load_transaction_rejects_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sender":"alice"}}"#).unwrap();
        assert!(load_transaction(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_transaction(Path::new("/nonexistent/tx.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tx.json"));
    }
}
