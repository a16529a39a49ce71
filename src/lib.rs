//! FraudGuard scoring core
//!
//! Scores payment transactions by combining four AI-derived signals, each
//! retried and degraded independently, into a fraud verdict.

pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod orchestrator;
pub mod retry;
pub mod scoring;
pub mod signals;
pub mod transaction;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::FraudOrchestrator;
pub use scoring::{FraudAssessment, Provenance};
pub use transaction::{PriorTransaction, SenderDetails, Transaction, TransactionHistory};
