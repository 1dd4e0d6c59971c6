//! Testing utilities and mock transports.
//!
//! - [`MockTransport`] replays a scripted queue of outcomes and records every
//!   request, for exercising the poll loop step by step.
//! - [`MockSodaService`] simulates the service itself (scans, commits,
//!   publication, working copies, geocoding backlog, deferred jobs), for
//!   lifecycle tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use sodaport_core::testing::{MockSodaService, MockRoute};
//!
//! let service = MockSodaService::new("http://mock.soda");
//! service.defer(MockRoute::Commit, 2, Duration::from_secs(1)).await;
//! let client = SodaClient::with_transport(Arc::new(service.clone()), &config);
//! ```

mod mock_service;
mod mock_transport;

pub use mock_service::{MockRoute, MockSodaService};
pub use mock_transport::MockTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::model::{
        Blueprint, BlueprintColumn, ColumnGuess, Dataset, PublicationStage, ScanResult,
        ScanSummary,
    };

    /// Header plus three data rows.
    pub const CRIMES_CSV: &str = "\
ID,Case Number,Primary Type,Address
1,HX100001,THEFT,100 N STATE ST
2,HX100002,BATTERY,200 W MADISON ST
3,HX100003,ROBBERY,300 S CLARK ST
";

    /// Scan result with the given `(name, suggested type)` columns.
    pub fn scan_result(file_id: &str, columns: &[(&str, &str)]) -> ScanResult {
        ScanResult {
            file_id: file_id.to_string(),
            summary: ScanSummary {
                columns: columns
                    .iter()
                    .map(|(name, suggestion)| ColumnGuess {
                        name: name.to_string(),
                        suggestion: suggestion.to_string(),
                        processor: None,
                    })
                    .collect(),
                headers: 1,
            },
        }
    }

    /// Blueprint with the given `(name, datatype)` columns and no skipped rows.
    pub fn blueprint(name: &str, columns: &[(&str, &str)]) -> Blueprint {
        Blueprint {
            name: name.to_string(),
            description: String::new(),
            skip_rows: 0,
            columns: columns
                .iter()
                .map(|(name, datatype)| BlueprintColumn::new(*name, *datatype))
                .collect(),
        }
    }

    /// An unpublished dataset as returned by the service.
    pub fn dataset(id: &str, name: &str) -> Dataset {
        Dataset {
            id: Some(id.to_string()),
            name: name.to_string(),
            description: None,
            publication_stage: PublicationStage::Unpublished,
            ..Default::default()
        }
    }

    pub fn published_dataset(id: &str, name: &str) -> Dataset {
        Dataset {
            publication_stage: PublicationStage::Published,
            ..dataset(id, name)
        }
    }

    /// A dataset name that will not collide across tests.
    pub fn unique_name(prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
    }
}
