//! Scripted transport for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::SodaError;
use crate::transport::{ApiRequest, AsyncTicket, Outcome, Payload, Transport};

/// Mock implementation of the Transport trait.
///
/// Each request consumes the next scripted outcome, in order, whatever its
/// URL. Running out of script is reported as a transport error.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<RwLock<VecDeque<Result<Outcome<Payload>, SodaError>>>>,
    requests: Arc<RwLock<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Script
    // =========================================================================

    /// Queue a definitive JSON response.
    pub async fn push_ready<T: Serialize + ?Sized>(&self, value: &T) {
        let payload = Payload::json(value).expect("mock response must serialize");
        self.push_outcome(Ok(Outcome::Ready(payload))).await;
    }

    /// Queue a definitive response with a raw body.
    pub async fn push_ready_raw(&self, body: Vec<u8>) {
        self.push_outcome(Ok(Outcome::Ready(Payload::new(body)))).await;
    }

    /// Queue a "still working" response.
    pub async fn push_pending(&self, ticket: AsyncTicket) {
        self.push_outcome(Ok(Outcome::Pending(ticket))).await;
    }

    /// Queue a failure.
    pub async fn push_error(&self, error: SodaError) {
        self.push_outcome(Err(error)).await;
    }

    pub async fn push_outcome(&self, outcome: Result<Outcome<Payload>, SodaError>) {
        self.responses.write().await.push_back(outcome);
    }

    /// Number of scripted outcomes not consumed yet.
    pub async fn remaining(&self) -> usize {
        self.responses.read().await.len()
    }

    // =========================================================================
    // Request Recording
    // =========================================================================

    pub async fn recorded_requests(&self) -> Vec<ApiRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Outcome<Payload>, SodaError> {
        let description = format!("{} {}", request.method, request.url);
        self.requests.write().await.push(request);

        self.responses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(SodaError::Transport(format!(
                    "no scripted response for {}",
                    description
                )))
            })
    }
}
