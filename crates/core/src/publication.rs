//! Publication of datasets, gated on outstanding geocoding.
//!
//! Geocoding jobs are short and their duration is not advertised, so the gate
//! checks on a fixed cadence instead of following server-suggested delays.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::endpoints::Endpoints;
use crate::error::SodaError;
use crate::model::{Dataset, GeocodingStatus};
use crate::resolver::LongRunningResolver;
use crate::transport::ApiRequest;

/// Default cadence of the pending-geocoding check.
pub const GEOCODING_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Requests publication lifecycle transitions.
#[derive(Clone)]
pub struct Publisher {
    resolver: LongRunningResolver,
    endpoints: Endpoints,
    max_attempts: u32,
    geocoding_interval: Duration,
}

impl Publisher {
    pub fn new(resolver: LongRunningResolver, endpoints: Endpoints, max_attempts: u32) -> Self {
        Self {
            resolver,
            endpoints,
            max_attempts,
            geocoding_interval: GEOCODING_CHECK_INTERVAL,
        }
    }

    pub fn with_geocoding_interval(mut self, interval: Duration) -> Self {
        self.geocoding_interval = interval;
        self
    }

    /// Current geocoding backlog of a dataset.
    pub async fn find_pending_geocoding(&self, dataset_id: &str) -> Result<GeocodingStatus, SodaError> {
        let request = ApiRequest::get(self.endpoints.pending_geocoding(dataset_id));
        self.resolver.call_json(request, self.max_attempts).await
    }

    /// Block until the dataset has no pending geocodes.
    ///
    /// Returns without sleeping when the first check is already clear. An
    /// interrupt only cuts the current wait short; checking continues.
    pub async fn wait_for_pending_geocoding(&self, dataset_id: &str) -> Result<(), SodaError> {
        let mut interrupted = self.resolver.interrupt_handle().subscribe();
        let mut status = self.find_pending_geocoding(dataset_id).await?;

        while !status.is_drained() {
            debug!(
                dataset_id,
                pending = status.pending_count,
                "Waiting for pending geocodes"
            );
            tokio::select! {
                _ = interrupted.recv() => {
                    warn!(dataset_id, "Geocoding wait interrupted, checking again");
                }
                _ = tokio::time::sleep(self.geocoding_interval) => {}
            }
            status = self.find_pending_geocoding(dataset_id).await?;
        }

        Ok(())
    }

    /// Publish a dataset (or a working copy, superseding its published original).
    pub async fn publish(&self, dataset_id: &str) -> Result<Dataset, SodaError> {
        self.wait_for_pending_geocoding(dataset_id).await?;

        let request = ApiRequest::post(self.endpoints.publication(dataset_id));
        let dataset: Dataset = self.resolver.call_json(request, self.max_attempts).await?;

        info!(dataset_id, "Dataset published");
        Ok(dataset)
    }

    /// Create an unpublished working copy of a published dataset.
    pub async fn create_working_copy(&self, dataset_id: &str) -> Result<Dataset, SodaError> {
        self.wait_for_pending_geocoding(dataset_id).await?;

        let request = ApiRequest::post(self.endpoints.working_copy(dataset_id));
        let copy: Dataset = self.resolver.call_json(request, self.max_attempts).await?;

        info!(
            dataset_id,
            working_copy_id = copy.id.as_deref().unwrap_or("<none>"),
            "Working copy created"
        );
        Ok(copy)
    }
}
