//! Per-job dispatch statistics.
//!
//! A fresh [`JobStats`] is created at the start of every job and folded as
//! each dispatch attempt settles. Counters are attempt-level: an item that
//! fails twice and then succeeds contributes two failures, two retries and
//! one success.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// One of the two interchangeable upstream payment endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Primary,
    Fallback,
}

impl Endpoint {
    /// Short name used in log fields and event payloads.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Primary => "primary",
            Endpoint::Fallback => "fallback",
        }
    }
}

/// Classification of a failed dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request exceeded the fixed per-call timeout.
    Timeout,
    /// Connection-level failure (DNS, refused, reset).
    Connection,
    /// Upstream returned HTTP 5xx.
    ServerError,
    /// Upstream returned HTTP 401.
    AuthError,
    /// Any other non-success response.
    Other,
}

/// Failure counts by [`ErrorKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHistogram {
    pub timeout: u64,
    pub connection: u64,
    pub server_error: u64,
    pub auth_error: u64,
    pub other: u64,
}

impl ErrorHistogram {
    /// Record one failure of the given kind.
    pub fn record(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Timeout => self.timeout += 1,
            ErrorKind::Connection => self.connection += 1,
            ErrorKind::ServerError => self.server_error += 1,
            ErrorKind::AuthError => self.auth_error += 1,
            ErrorKind::Other => self.other += 1,
        }
    }

    /// Sum over all kinds.
    pub fn total(&self) -> u64 {
        self.timeout + self.connection + self.server_error + self.auth_error + self.other
    }
}

/// Aggregate counters for one disbursement job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    /// Total dispatch attempts (successful + failed).
    pub attempted: u64,
    /// Successful attempts. Each item succeeds at most once.
    pub successful: u64,
    /// Failed attempts, including attempts that were later retried.
    pub failed: u64,
    /// Failed attempts that were requeued for another try.
    pub retried: u64,

    /// Requests sent to the primary endpoint.
    pub primary_requests: u64,
    /// Successes from the primary endpoint.
    pub primary_successes: u64,
    /// Requests sent to the fallback endpoint.
    pub fallback_requests: u64,
    /// Successes from the fallback endpoint.
    pub fallback_successes: u64,

    /// Failure counts by classification.
    pub errors: ErrorHistogram,

    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl JobStats {
    /// A zeroed snapshot stamped with the job start time.
    pub fn started_now() -> Self {
        Self {
            started_at: Some(chrono::Utc::now()),
            ..Default::default()
        }
    }

    /// Fold one successful attempt.
    pub fn record_success(&mut self, endpoint: Endpoint) {
        self.attempted += 1;
        self.successful += 1;
        self.record_request(endpoint, true);
    }

    /// Fold one failed attempt.
    pub fn record_failure(&mut self, endpoint: Endpoint, kind: ErrorKind) {
        self.attempted += 1;
        self.failed += 1;
        self.errors.record(kind);
        self.record_request(endpoint, false);
    }

    /// Fold a requeue of a failed attempt.
    pub fn record_retry(&mut self) {
        self.retried += 1;
        debug_assert!(self.retried <= self.failed, "retries cannot exceed failures");
    }

    fn record_request(&mut self, endpoint: Endpoint, success: bool) {
        match endpoint {
            Endpoint::Primary => {
                self.primary_requests += 1;
                if success {
                    self.primary_successes += 1;
                }
            }
            Endpoint::Fallback => {
                self.fallback_requests += 1;
                if success {
                    self.fallback_successes += 1;
                }
            }
        }
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now());
    }

    /// Attempts that exhausted their retry budget without succeeding.
    ///
    /// `failed` counts every failed attempt and `retried` counts every
    /// requeue, so the difference is the number of items whose final
    /// attempt failed. Structurally non-negative; saturates as a guard.
    pub fn permanent_failures(&self) -> u64 {
        debug_assert!(self.failed >= self.retried);
        self.failed.saturating_sub(self.retried)
    }

    /// Elapsed seconds between start and finish (or now, mid-run).
    pub fn elapsed_secs(&self) -> f64 {
        let Some(started) = self.started_at else {
            return 0.0;
        };
        let end = self.finished_at.unwrap_or_else(chrono::Utc::now);
        (end - started).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Attempts per second over the elapsed window.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs == 0.0 {
            0.0
        } else {
            self.attempted as f64 / secs
        }
    }

    /// Fraction of attempts that succeeded, in [0, 1].
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.successful as f64 / self.attempted as f64
        }
    }

    /// Per-endpoint success fraction, in [0, 1].
    pub fn endpoint_success_rate(&self, endpoint: Endpoint) -> f64 {
        let (requests, successes) = match endpoint {
            Endpoint::Primary => (self.primary_requests, self.primary_successes),
            Endpoint::Fallback => (self.fallback_requests, self.fallback_successes),
        };
        if requests == 0 {
            0.0
        } else {
            successes as f64 / requests as f64
        }
    }
}
