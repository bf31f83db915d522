//! Gateway configuration loaded from environment variables.

use std::time::Duration;

/// Connection settings for the two payment endpoints and the token
/// provider. All fields have local-development defaults.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the primary payment endpoint.
    pub primary_url: String,
    /// Base URL of the fallback payment endpoint.
    pub fallback_url: String,
    /// OAuth token endpoint URL.
    pub token_url: String,
    /// Client credential id for token requests.
    pub client_id: String,
    /// Client credential secret for token requests.
    pub client_secret: String,
    /// Probability of picking the primary endpoint, in [0, 1].
    pub primary_split: f64,
    /// Fixed per-request timeout.
    pub request_timeout: Duration,
}

impl GatewayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `PAYMENT_PRIMARY_URL`      | `http://localhost:9401`          |
    /// | `PAYMENT_FALLBACK_URL`     | `http://localhost:9402`          |
    /// | `PAYMENT_TOKEN_URL`        | `http://localhost:9400/oauth/token` |
    /// | `PAYMENT_CLIENT_ID`        | `remit`                          |
    /// | `PAYMENT_CLIENT_SECRET`    | (empty)                          |
    /// | `PAYMENT_PRIMARY_SPLIT`    | `0.5`                            |
    /// | `PAYMENT_TIMEOUT_SECS`     | `15`                             |
    pub fn from_env() -> Self {
        let primary_url = std::env::var("PAYMENT_PRIMARY_URL")
            .unwrap_or_else(|_| "http://localhost:9401".into());
        let fallback_url = std::env::var("PAYMENT_FALLBACK_URL")
            .unwrap_or_else(|_| "http://localhost:9402".into());
        let token_url = std::env::var("PAYMENT_TOKEN_URL")
            .unwrap_or_else(|_| "http://localhost:9400/oauth/token".into());
        let client_id = std::env::var("PAYMENT_CLIENT_ID").unwrap_or_else(|_| "remit".into());
        let client_secret = std::env::var("PAYMENT_CLIENT_SECRET").unwrap_or_default();

        let primary_split: f64 = std::env::var("PAYMENT_PRIMARY_SPLIT")
            .unwrap_or_else(|_| "0.5".into())
            .parse()
            .expect("PAYMENT_PRIMARY_SPLIT must be a valid f64");

        let timeout_secs: u64 = std::env::var("PAYMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("PAYMENT_TIMEOUT_SECS must be a valid u64");

        Self {
            primary_url,
            fallback_url,
            token_url,
            client_id,
            client_secret,
            primary_split: primary_split.clamp(0.0, 1.0),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
