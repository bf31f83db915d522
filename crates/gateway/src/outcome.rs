//! Submission outcomes and failure classification.

use remit_core::stats::{Endpoint, ErrorKind};
use serde::{Deserialize, Serialize};

/// The settled result of one payment submission.
///
/// Failures are data, not errors: an item-level failure never aborts a
/// batch. Only infrastructure problems (see `GatewayError`) surface as
/// `Err` from the submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success {
        endpoint: Endpoint,
        latency_ms: u64,
        status_code: u16,
        description: String,
    },
    Failure {
        endpoint: Endpoint,
        latency_ms: u64,
        kind: ErrorKind,
        message: String,
    },
}

impl SubmissionOutcome {
    /// The endpoint that served this attempt.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            SubmissionOutcome::Success { endpoint, .. }
            | SubmissionOutcome::Failure { endpoint, .. } => *endpoint,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success { .. })
    }
}

/// Classify a non-success HTTP status code.
///
/// 401 -> auth, 5xx -> server, everything else -> other.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::AuthError,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Other,
    }
}

/// Classify a transport-level request error.
pub fn classify_transport(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_connect() {
        ErrorKind::Connection
    } else {
        ErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_auth_error() {
        assert_eq!(classify_status(401), ErrorKind::AuthError);
    }

    #[test]
    fn server_errors_cover_the_5xx_range() {
        assert_eq!(classify_status(500), ErrorKind::ServerError);
        assert_eq!(classify_status(503), ErrorKind::ServerError);
        assert_eq!(classify_status(599), ErrorKind::ServerError);
    }

    #[test]
    fn everything_else_is_other() {
        for status in [400, 403, 404, 409, 422, 429] {
            assert_eq!(classify_status(status), ErrorKind::Other, "status {status}");
        }
    }

    #[test]
    fn outcome_accessors() {
        let outcome = SubmissionOutcome::Failure {
            endpoint: Endpoint::Fallback,
            latency_ms: 12,
            kind: ErrorKind::Timeout,
            message: "deadline exceeded".into(),
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.endpoint(), Endpoint::Fallback);
    }
}
