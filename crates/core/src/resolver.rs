//! Resolution of long-running operations.
//!
//! When the service defers a request it hands back an [`AsyncTicket`]. The
//! resolver waits the suggested delay, polls the ticket's location, and
//! repeats while the service keeps deferring. Only attempts bound the loop:
//! delays are chosen by the server, so a wall-clock budget would be theirs to
//! stretch.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::SodaError;
use crate::transport::{ApiRequest, AsyncTicket, Outcome, Payload, Transport};

/// Attempt budget for operations the caller is prepared to wait on indefinitely.
pub const UNBOUNDED_ATTEMPTS: u32 = u32::MAX;

/// Handle used to cut short the waits between polls.
///
/// Cloning shares the underlying channel; firing it reaches every wait that
/// is in progress at that moment.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: broadcast::Sender<()>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Interrupt all waits currently in progress.
    pub fn interrupt(&self) {
        // No receivers just means nobody is waiting.
        let _ = self.tx.send(());
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for InterruptHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns deferred responses into completed, decoded results.
#[derive(Clone)]
pub struct LongRunningResolver {
    transport: Arc<dyn Transport>,
    interrupt: InterruptHandle,
}

impl LongRunningResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_interrupt(transport, InterruptHandle::new())
    }

    pub fn with_interrupt(transport: Arc<dyn Transport>, interrupt: InterruptHandle) -> Self {
        Self {
            transport,
            interrupt,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn interrupt_handle(&self) -> &InterruptHandle {
        &self.interrupt
    }

    /// Poll `ticket` until the operation completes, then decode the result.
    ///
    /// Each round sleeps for the current ticket's delay, then GETs its
    /// location. A fresh ticket replaces the old one and costs an attempt.
    /// Service and transport errors are returned as-is; only deferrals are
    /// retried. After `max_attempts` deferred polls this fails with
    /// [`SodaError::PollingExhausted`] carrying the last ticket.
    pub async fn resolve<T, D>(
        &self,
        ticket: AsyncTicket,
        max_attempts: u32,
        decode: D,
    ) -> Result<T, SodaError>
    where
        D: Fn(&Payload) -> Result<T, SodaError> + Send + Sync,
        T: Send,
    {
        if max_attempts == 0 {
            return Err(SodaError::InvalidArgument(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let mut interrupted = self.interrupt.subscribe();
        let mut ticket = ticket;

        for attempt in 1..=max_attempts {
            tokio::select! {
                _ = interrupted.recv() => {
                    warn!(
                        poll_location = %ticket.poll_location,
                        attempt,
                        "Interrupted while waiting on long-running operation"
                    );
                    return Err(SodaError::Interrupted);
                }
                _ = tokio::time::sleep(ticket.retry_delay) => {}
            }

            debug!(
                poll_location = %ticket.poll_location,
                attempt,
                max_attempts,
                "Polling long-running operation"
            );

            let request = ApiRequest::get(ticket.poll_location.clone());
            match self.transport.execute(request).await? {
                Outcome::Ready(payload) => return decode(&payload),
                Outcome::Pending(next) => ticket = next,
            }
        }

        warn!(
            poll_location = %ticket.poll_location,
            attempts = max_attempts,
            "Long-running operation still pending, giving up"
        );
        Err(SodaError::PollingExhausted {
            ticket,
            attempts: max_attempts,
        })
    }

    /// [`Self::resolve`] with JSON decoding.
    pub async fn resolve_json<T>(&self, ticket: AsyncTicket, max_attempts: u32) -> Result<T, SodaError>
    where
        T: DeserializeOwned + Send,
    {
        self.resolve(ticket, max_attempts, Payload::decode::<T>).await
    }

    /// Issue `request`; if the service defers it, resolve the ticket.
    ///
    /// Errors on the initial request never reach the poll loop.
    pub async fn call<T, D>(
        &self,
        request: ApiRequest,
        max_attempts: u32,
        decode: D,
    ) -> Result<T, SodaError>
    where
        D: Fn(&Payload) -> Result<T, SodaError> + Send + Sync,
        T: Send,
    {
        match self.transport.execute(request).await? {
            Outcome::Ready(payload) => decode(&payload),
            Outcome::Pending(ticket) => self.resolve(ticket, max_attempts, decode).await,
        }
    }

    /// [`Self::call`] with JSON decoding.
    pub async fn call_json<T>(&self, request: ApiRequest, max_attempts: u32) -> Result<T, SodaError>
    where
        T: DeserializeOwned + Send,
    {
        self.call(request, max_attempts, Payload::decode::<T>).await
    }
}
