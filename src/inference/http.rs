//! Shared HTTP plumbing for inference providers

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::error::{Error, Result};

/// Longest response body kept in error messages
const MAX_ERROR_BODY_LEN: usize = 512;

/// Build an HTTP client with a whole-request timeout
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Pass successful responses through, map everything else onto the error taxonomy
pub async fn check_status(provider: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, status, &body))
}

/// 429 is retryable, 503 ends the attempt loop, anything else is reported verbatim
pub fn status_error(provider: &'static str, status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited { provider },
        StatusCode::SERVICE_UNAVAILABLE => Error::ServiceUnavailable(provider),
        _ => Error::UnexpectedStatus {
            provider,
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY_LEN),
        },
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
