//! Transport abstraction.
//!
//! This module provides a `Transport` trait that issues a single HTTP request
//! and classifies the answer as ready, pending (with an [`AsyncTicket`]) or
//! failed. Nothing here retries; long-running operations are resumed by
//! [`crate::resolver::LongRunningResolver`].

mod http;
mod types;

pub use http::HttpTransport;
pub use types::*;

use async_trait::async_trait;

use crate::error::SodaError;

/// Trait for issuing requests against the dataset service.
///
/// Implementations must return `Outcome::Pending` (never an error) when the
/// service answers "processing, check back", and must not retry network
/// failures on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and classify the response.
    async fn execute(&self, request: ApiRequest) -> Result<Outcome<Payload>, SodaError>;
}
