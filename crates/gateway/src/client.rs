//! The payment submitter and its HTTP implementation.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use remit_core::stats::Endpoint;
use remit_db::models::client::Client;
use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::outcome::{classify_status, classify_transport, SubmissionOutcome};
use crate::token::{TokenError, TokenProvider};

/// Infrastructure-level gateway failure.
///
/// Item-level failures are represented inside [`SubmissionOutcome`]; an
/// `Err` from [`PaymentSubmitter::submit`] means no submission could be
/// attempted at all and the whole job should abort.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Credential acquisition failed: {0}")]
    Token(#[from] TokenError),
}

/// Submits one payment request and classifies the result.
#[async_trait::async_trait]
pub trait PaymentSubmitter: Send + Sync {
    async fn submit(&self, client: &Client) -> Result<SubmissionOutcome, GatewayError>;
}

/// Success-body shape returned by the payment endpoints.
#[derive(Debug, Deserialize)]
struct PaymentResponse {
    #[serde(default)]
    description: Option<String>,
}

/// HTTP payment gateway over two interchangeable endpoints.
pub struct PaymentGateway {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    config: GatewayConfig,
}

impl PaymentGateway {
    /// Build a gateway with its own connection pool and request timeout.
    pub fn new(config: GatewayConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            http,
            tokens,
            config,
        }
    }

    /// Pick an endpoint for one call. No session affinity: every call
    /// rolls independently.
    fn pick_endpoint(&self) -> Endpoint {
        select_endpoint(self.config.primary_split, rand::rng().random::<f64>())
    }

    fn base_url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Primary => &self.config.primary_url,
            Endpoint::Fallback => &self.config.fallback_url,
        }
    }
}

/// Pure endpoint selection: rolls below the split go to the primary.
fn select_endpoint(primary_split: f64, roll: f64) -> Endpoint {
    if roll < primary_split {
        Endpoint::Primary
    } else {
        Endpoint::Fallback
    }
}

#[async_trait::async_trait]
impl PaymentSubmitter for PaymentGateway {
    async fn submit(&self, client: &Client) -> Result<SubmissionOutcome, GatewayError> {
        let token = self.tokens.bearer_token().await?;
        let endpoint = self.pick_endpoint();
        let url = format!("{}/api/payments", self.base_url(endpoint));

        let body = serde_json::json!({
            "subscriber_no": client.subscriber_no,
            "offer_code": client.offer_code,
        });

        let started = Instant::now();
        let result = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let description = response
                        .json::<PaymentResponse>()
                        .await
                        .ok()
                        .and_then(|r| r.description)
                        .unwrap_or_else(|| "accepted".into());
                    SubmissionOutcome::Success {
                        endpoint,
                        latency_ms,
                        status_code: status.as_u16(),
                        description,
                    }
                } else {
                    let message = response.text().await.unwrap_or_default();
                    SubmissionOutcome::Failure {
                        endpoint,
                        latency_ms,
                        kind: classify_status(status.as_u16()),
                        message: format!("HTTP {}: {}", status.as_u16(), message.trim()),
                    }
                }
            }
            Err(e) => SubmissionOutcome::Failure {
                endpoint,
                latency_ms,
                kind: classify_transport(&e),
                message: e.to_string(),
            },
        };

        tracing::debug!(
            subscriber_no = %client.subscriber_no,
            endpoint = endpoint.name(),
            latency_ms,
            success = outcome.is_success(),
            "Payment submission settled",
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_below_split_picks_primary() {
        assert_eq!(select_endpoint(0.5, 0.0), Endpoint::Primary);
        assert_eq!(select_endpoint(0.5, 0.49), Endpoint::Primary);
    }

    #[test]
    fn roll_at_or_above_split_picks_fallback() {
        assert_eq!(select_endpoint(0.5, 0.5), Endpoint::Fallback);
        assert_eq!(select_endpoint(0.5, 0.99), Endpoint::Fallback);
    }

    #[test]
    fn degenerate_splits_pin_one_endpoint() {
        for roll in [0.0, 0.3, 0.7, 0.999] {
            assert_eq!(select_endpoint(1.0, roll), Endpoint::Primary);
            assert_eq!(select_endpoint(0.0, roll), Endpoint::Fallback);
        }
    }
}
