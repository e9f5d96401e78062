//! HTTP submit client for producers
//!
//! Producers (browser-extension backends, test harnesses) embed this client
//! to push events to a commentpulse server. The retry decorator wraps the
//! single outbound call with bounded attempts and exponential backoff; it
//! lives here, on the producer side, and never inside the ingestion or
//! aggregation path. The server performs no retries of its own; retry policy
//! belongs to the producer.
//!
//! Submission is safe to retry because ingestion is idempotent: resending
//! the same `eventId` is absorbed server-side as a no-op.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;

use crate::config::SubmitConfig;
use crate::error::{Error, Result};
use crate::types::Event;

/// Response from POST /api/analytics/event
#[derive(Debug, Deserialize)]
pub struct SubmitReceipt {
    /// Whether the event was accepted (including duplicate no-ops)
    pub success: bool,
    /// True when the server had already stored this `eventId`
    #[serde(default)]
    pub duplicate: bool,
}

/// HTTP client for the commentpulse event API
pub struct SubmitClient {
    http_client: reqwest::Client,
    base_url: String,
    max_retries: usize,
    retry_base: Duration,
}

impl SubmitClient {
    /// Create a new submit client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &SubmitConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .server_url
            .clone()
            .ok_or_else(|| Error::Config("submit.server_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            max_retries: config.max_retries,
            retry_base: Duration::from_millis(config.retry_base_ms),
        })
    }

    /// Submit a single event, no retries.
    pub async fn submit_event(&self, event: &Event) -> Result<SubmitReceipt> {
        let url = format!("{}/api/analytics/event", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(|e| Error::Submit(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let receipt: SubmitReceipt = response
                .json()
                .await
                .map_err(|e| Error::Submit(format!("failed to parse response: {}", e)))?;
            Ok(receipt)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Submit(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    /// Submit an event with bounded retry.
    ///
    /// Retries transient failures (5xx, timeouts, connection errors) with
    /// exponential backoff starting at the configured base delay. Validation
    /// rejections (4xx) surface immediately: resubmitting an invalid payload
    /// unchanged cannot succeed.
    pub async fn submit_with_retry(&self, event: &Event) -> Result<SubmitReceipt> {
        let mut last_error = None;
        let mut delay = self.retry_base;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    event_id = %event.event_id,
                    attempt = attempt + 1,
                    max_attempts = self.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying event submission"
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.submit_event(event).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    if is_retryable_error(&e) {
                        tracing::warn!(event_id = %event.event_id, error = %e, "Transient submit failure");
                        last_error = Some(e);
                        continue;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Submit("max retries exceeded".to_string())))
    }

    /// Check if the client can reach the server
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.http_client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Submit(msg) => {
            // Retry on 5xx errors
            msg.contains("50") && (msg.contains("API error") || msg.contains("HTTP"))
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_url_when_enabled() {
        let config = SubmitConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(SubmitClient::new(&config).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = SubmitConfig {
            enabled: true,
            server_url: Some("http://127.0.0.1:3000".to_string()),
            ..Default::default()
        };
        let client = SubmitClient::new(&config).expect("valid config");
        assert_eq!(client.base_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = SubmitConfig {
            enabled: true,
            server_url: Some("http://127.0.0.1:3000/".to_string()),
            ..Default::default()
        };
        let client = SubmitClient::new(&config).expect("valid config");
        assert_eq!(client.base_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::Submit(
            "API error (503): unavailable".to_string()
        )));
        assert!(is_retryable_error(&Error::Submit(
            "HTTP request failed: timeout".to_string()
        )));
        assert!(!is_retryable_error(&Error::Submit(
            "API error (400): bad request".to_string()
        )));
        assert!(!is_retryable_error(&Error::Config(
            "submit.server_url is required".to_string()
        )));
    }
}
