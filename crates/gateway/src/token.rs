//! Bearer-token acquisition with TTL caching.
//!
//! The upstream endpoints require a bearer credential issued by an OAuth
//! token endpoint. [`HttpTokenProvider`] caches the token until shortly
//! before its provider-side expiry. Token issuance is idempotent, so two
//! tasks racing a refresh is harmless — the loser just overwrites the
//! cache with an equally valid token.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;

/// Refresh this long before the provider-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Errors from token acquisition.
///
/// These are infrastructure errors: without a credential no submission can
/// proceed, so they abort the job rather than count as item failures.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The HTTP request to the token endpoint failed.
    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The token endpoint rejected the credentials.
    #[error("Token endpoint returned HTTP {0}")]
    Rejected(u16),
}

/// Source of bearer credentials for upstream calls.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// A bearer token valid for at least the next request.
    async fn bearer_token(&self) -> Result<String, TokenError>;
}

/// Response shape of the OAuth token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Validity in seconds from issuance.
    expires_in: u64,
}

/// A cached token with its computed local expiry.
#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Whether the token is still usable at `now`, honoring the margin.
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

/// Token provider backed by an OAuth client-credentials endpoint.
pub struct HttpTokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: RwLock<Option<CachedToken>>,
}

impl HttpTokenProvider {
    /// Build a provider from gateway configuration with its own
    /// connection pool.
    pub fn from_config(config: &crate::config::GatewayConfig) -> Self {
        Self::new(
            reqwest::Client::new(),
            config.token_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        )
    }

    pub fn new(
        client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            cached: RwLock::new(None),
        }
    }

    /// Request a fresh token from the provider.
    async fn refresh(&self) -> Result<CachedToken, TokenError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Rejected(status.as_u16()));
        }

        let body: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = body.expires_in, "Obtained fresh bearer token");

        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn bearer_token(&self) -> Result<String, TokenError> {
        // Fast path: a cached token that is still fresh.
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh(Instant::now()) {
                    return Ok(token.token.clone());
                }
            }
        }

        // Refresh outside the lock; concurrent refreshes may race and the
        // last writer wins, which is fine since issuance is idempotent.
        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_fresh_within_ttl() {
        let token = CachedToken {
            token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(300),
        };
        assert!(token.is_fresh(Instant::now()));
    }

    #[test]
    fn cached_token_stale_inside_margin() {
        // Expires in 10s, which is inside the 30s refresh margin.
        let token = CachedToken {
            token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(10),
        };
        assert!(!token.is_fresh(Instant::now()));
    }

    #[test]
    fn cached_token_stale_after_expiry() {
        let now = Instant::now();
        let token = CachedToken {
            token: "t".into(),
            expires_at: now,
        };
        assert!(!token.is_fresh(now));
    }
}
