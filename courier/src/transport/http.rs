//! Shared plumbing for the HTTP API transports

use std::time::Duration;

use courier_common::TransportError;

use crate::error::ConfigError;

pub const fn default_timeout() -> u64 {
    30
}

pub fn client(timeout: u64) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()
        .map_err(|err| ConfigError::HttpClient(err.to_string()))
}

pub fn request_error(endpoint: &str, timeout: u64, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connect {
            server: endpoint.to_string(),
            reason: err.to_string(),
        }
    } else {
        TransportError::Http(err.to_string())
    }
}

/// Fail on a non-2xx status, keeping the body for the error message
pub async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(TransportError::Http(format!(
        "{provider} API error ({status}): {body}"
    )))
}
