//! Client facade wiring transport, resolver and operations from a [`Config`].

use std::sync::Arc;

use crate::config::Config;
use crate::endpoints::Endpoints;
use crate::error::SodaError;
use crate::importer::Importer;
use crate::publication::Publisher;
use crate::resolver::{InterruptHandle, LongRunningResolver};
use crate::transport::{HttpTransport, Transport};
use crate::views::Views;

/// Entry point for talking to a dataset service.
///
/// Holds no server state; every call reads fresh from the service, so clones
/// can be handed to concurrent tasks freely.
#[derive(Clone)]
pub struct SodaClient {
    importer: Importer,
    publisher: Publisher,
    views: Views,
    interrupt: InterruptHandle,
}

impl SodaClient {
    /// Client backed by the HTTP transport.
    pub fn from_config(config: &Config) -> Result<Self, SodaError> {
        let transport = HttpTransport::new(&config.connection, &config.polling)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Client over any transport (tests inject mocks here).
    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let interrupt = InterruptHandle::new();
        let resolver = LongRunningResolver::with_interrupt(transport, interrupt.clone());
        let endpoints = Endpoints::new(&config.connection.url);
        let max_attempts = config.polling.max_attempts;

        Self {
            importer: Importer::new(resolver.clone(), endpoints.clone(), max_attempts),
            publisher: Publisher::new(resolver.clone(), endpoints.clone(), max_attempts)
                .with_geocoding_interval(config.polling.geocoding_interval()),
            views: Views::new(resolver, endpoints, max_attempts),
            interrupt,
        }
    }

    pub fn importer(&self) -> &Importer {
        &self.importer
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn views(&self) -> &Views {
        &self.views
    }

    /// Interrupts waits in progress on this client and its clones.
    pub fn interrupt_handle(&self) -> &InterruptHandle {
        &self.interrupt
    }
}
