//! Bulk import: scan a file, describe its schema, commit it as a dataset.

mod blueprint;

pub use blueprint::BlueprintBuilder;

use std::path::Path;

use tracing::{debug, info, warn};

use crate::endpoints::Endpoints;
use crate::error::SodaError;
use crate::model::{Blueprint, Dataset, ScanResult, Translation};
use crate::resolver::{LongRunningResolver, UNBOUNDED_ATTEMPTS};
use crate::transport::ApiRequest;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// Drives the scan -> blueprint -> translation -> commit pipeline.
#[derive(Clone)]
pub struct Importer {
    resolver: LongRunningResolver,
    endpoints: Endpoints,
    /// Budget for scans. Commits are waited on without a cap.
    max_attempts: u32,
}

impl Importer {
    pub fn new(resolver: LongRunningResolver, endpoints: Endpoints, max_attempts: u32) -> Self {
        Self {
            resolver,
            endpoints,
            max_attempts,
        }
    }

    /// Upload a file so the service can guess its columns.
    pub async fn scan(&self, file: &Path) -> Result<ScanResult, SodaError> {
        let file_name = file_name(file)?;
        let bytes = tokio::fs::read(file).await?;
        debug!(file = %file.display(), bytes = bytes.len(), "Scanning file");

        let request = ApiRequest::post_file(
            self.endpoints.scan(file_name),
            file_name,
            CSV_CONTENT_TYPE,
            bytes,
        );
        let scan: ScanResult = self.resolver.call_json(request, self.max_attempts).await?;

        debug!(
            file_id = %scan.file_id,
            columns = scan.inferred_columns().len(),
            "Scan complete"
        );
        Ok(scan)
    }

    /// Create a dataset from a file with a header row and the guessed column types.
    pub async fn create_from_file_default(
        &self,
        name: &str,
        description: &str,
        file: &Path,
    ) -> Result<Dataset, SodaError> {
        let scan = self.scan(file).await?;
        self.import_scan_results(name, description, file, &scan).await
    }

    /// Commit an earlier scan with the default blueprint.
    ///
    /// The first row is always skipped as a header, whatever the file holds.
    /// Like every commit, the import is waited on without an attempt cap.
    pub async fn import_scan_results(
        &self,
        name: &str,
        description: &str,
        file: &Path,
        scan: &ScanResult,
    ) -> Result<Dataset, SodaError> {
        let blueprint = BlueprintBuilder::from_scan(scan)
            .skip_rows(1)
            .name(name)
            .description(description)
            .build();
        let translation = Translation::identity(&blueprint);

        self.commit(&blueprint, &translation, file, scan).await
    }

    /// Commit a scan with a caller-supplied blueprint.
    ///
    /// Without a translation every column maps to itself.
    pub async fn create_from_file_explicit(
        &self,
        blueprint: &Blueprint,
        translation: Option<&Translation>,
        file: &Path,
        scan: &ScanResult,
    ) -> Result<Dataset, SodaError> {
        let identity;
        let translation = match translation {
            Some(translation) => translation,
            None => {
                identity = Translation::identity(blueprint);
                &identity
            }
        };

        self.commit(blueprint, translation, file, scan).await
    }

    async fn commit(
        &self,
        blueprint: &Blueprint,
        translation: &Translation,
        file: &Path,
        scan: &ScanResult,
    ) -> Result<Dataset, SodaError> {
        if translation.len() != blueprint.columns.len() {
            warn!(
                columns = blueprint.columns.len(),
                translation = translation.len(),
                "Translation length does not match blueprint columns"
            );
        }

        let form = vec![
            ("translation".to_string(), serde_json::to_string(translation)?),
            ("fileId".to_string(), scan.file_id.clone()),
            ("name".to_string(), file_name(file)?.to_string()),
            ("blueprint".to_string(), serde_json::to_string(blueprint)?),
        ];

        debug!(
            file_id = %scan.file_id,
            name = %blueprint.name,
            columns = blueprint.columns.len(),
            "Committing import"
        );
        let request = ApiRequest::post_form(self.endpoints.imports(), form);
        let dataset: Dataset = self.resolver.call_json(request, UNBOUNDED_ATTEMPTS).await?;

        info!(
            dataset_id = dataset.id.as_deref().unwrap_or("<none>"),
            name = %dataset.name,
            "Dataset imported"
        );
        Ok(dataset)
    }
}

fn file_name(file: &Path) -> Result<&str, SodaError> {
    file.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            SodaError::InvalidArgument(format!("'{}' has no usable file name", file.display()))
        })
}
