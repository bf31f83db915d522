//! Upstream payment client.
//!
//! [`PaymentGateway`] submits one disbursement request per call to one of
//! two interchangeable remote endpoints, picked at random per call with a
//! configurable split. Every call is bounded by a fixed timeout and its
//! result is classified into a [`SubmissionOutcome`]. Bearer credentials
//! come from a [`TokenProvider`] that caches tokens for their provider-side
//! TTL.

pub mod client;
pub mod config;
pub mod outcome;
pub mod token;

pub use client::{GatewayError, PaymentGateway, PaymentSubmitter};
pub use config::GatewayConfig;
pub use outcome::SubmissionOutcome;
pub use token::{HttpTokenProvider, TokenError, TokenProvider};
