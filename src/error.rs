//! Error types for the fraud scoring core

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scoring core
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    // Provider errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider call timed out after {0}ms")]
    Timeout(u64),

    #[error("Rate limited by {provider}")]
    RateLimited { provider: &'static str },

    #[error("{0} is unavailable")]
    ServiceUnavailable(&'static str),

    #[error("{provider} returned HTTP {status}: {body}")]
    UnexpectedStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {provider}: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    // Scoring errors
    #[error("Invalid {component} score: {value}")]
    InvalidScore { component: &'static str, value: f64 },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout(_) | Error::RateLimited { .. } => true,
            // Client errors other than request-timeout will not fix themselves
            Error::UnexpectedStatus { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Terminal errors skip the remaining retry budget
    /// (explicit unavailability, bad config, unparseable payloads).
    pub fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }

    pub fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            provider,
            reason: reason.into(),
        }
    }
}

// Conversion from HTTP client errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Transport(format!("request timed out: {}", e))
        } else {
            Error::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = Error::RateLimited { provider: "gemini" };
        assert!(err.is_retryable());
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_unavailable_is_terminal() {
        let err = Error::ServiceUnavailable("huggingface");
        assert!(!err.is_retryable());
        assert!(err.is_terminal());
    }

    #[test]
    fn test_status_classification() {
        let server = Error::UnexpectedStatus {
            provider: "gemini",
            status: 502,
            body: String::new(),
        };
        let auth = Error::UnexpectedStatus {
            provider: "gemini",
            status: 401,
            body: "bad key".to_string(),
        };
        assert!(server.is_retryable());
        assert!(auth.is_terminal());
    }

    #[test]
    fn test_malformed_is_terminal() {
        let err = Error::malformed("huggingface", "missing label");
        assert!(err.is_terminal());
        assert_eq!(
            err.to_string(),
            "Malformed response from huggingface: missing label"
        );
    }
}
