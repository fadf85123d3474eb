// ABOUTME: Shared HTTP plumbing for connector adapters
// ABOUTME: Timeout-bounded client construction and bounded jittered-backoff retry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! HTTP helpers shared by all adapters.
//!
//! Every provider call runs on a client with an explicit timeout. Resource
//! calls go through [`send_with_retry`]: transient failures (429, 5xx,
//! transport errors) are retried a bounded number of times with exponential
//! backoff plus jitter, then surfaced as a typed
//! [`ConnectorError::ResourceQuery`] carrying the last status. Auth-style 4xx
//! responses are never retried. Token exchange and refresh are single-shot;
//! retry policy there belongs to the caller's re-authorization flow.

use rand::Rng;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use crate::constants::timeouts;
use crate::errors::{ConnectorError, ConnectorResult};

/// Configuration for adapter retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts after the initial one
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound of the random jitter added to each backoff, milliseconds
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_jitter_ms: 250,
        }
    }
}

impl RetryConfig {
    /// Retry disabled; used where a caller wants exactly one attempt
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            max_jitter_ms: 0,
        }
    }
}

/// Build the shared provider HTTP client with an explicit request timeout.
///
/// # Errors
///
/// Returns [`ConnectorError::Configuration`] if the TLS backend fails to
/// initialize.
pub fn provider_client() -> ConnectorResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeouts::PROVIDER_HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| ConnectorError::config(format!("failed to build HTTP client: {e}")))
}

/// Whether a status should be retried as transient
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send a request with bounded jittered-backoff retry on transient failures.
///
/// The request is cloned per attempt; bodies must therefore be buffered
/// (form/json builders qualify). Returns the first non-transient response,
/// which the caller still has to status-check for provider-specific mapping.
///
/// # Errors
///
/// Returns [`ConnectorError::ResourceQuery`] once attempts are exhausted,
/// carrying the last HTTP status when one was received.
pub async fn send_with_retry(
    request: RequestBuilder,
    connector: &str,
    retry: &RetryConfig,
) -> ConnectorResult<Response> {
    let mut attempt: u32 = 0;
    loop {
        let Some(this_attempt) = request.try_clone() else {
            return Err(ConnectorError::resource_query(
                connector,
                None,
                "request body is not cloneable for retry",
            ));
        };

        let outcome = this_attempt.send().await;
        let (status, detail) = match outcome {
            Ok(response) if !is_retryable(response.status()) => return Ok(response),
            Ok(response) => {
                let status = response.status();
                (Some(status.as_u16()), format!("provider returned {status}"))
            }
            Err(e) => (e.status().map(|s| s.as_u16()), e.to_string()),
        };

        attempt += 1;
        if attempt > retry.max_retries {
            return Err(ConnectorError::resource_query(connector, status, detail));
        }

        let backoff_ms = retry.initial_backoff_ms * 2_u64.pow(attempt - 1)
            + rand::thread_rng().gen_range(0..=retry.max_jitter_ms);
        warn!(
            connector,
            attempt,
            max_retries = retry.max_retries,
            backoff_ms,
            "transient provider failure, backing off: {detail}"
        );
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }
}

/// Read a response body for inclusion in an error message, bounded and
/// never failing
pub async fn error_body(response: Response) -> String {
    response.text().await.map_or_else(
        |_| String::from("<unreadable body>"),
        |body| body.chars().take(256).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::OK));
    }

    #[test]
    fn test_retry_config_none_disables_retries() {
        let config = RetryConfig::none();
        assert_eq!(config.max_retries, 0);
    }
}
