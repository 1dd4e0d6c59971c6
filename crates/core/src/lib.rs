pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod importer;
pub mod model;
pub mod publication;
pub mod resolver;
pub mod testing;
pub mod transport;
pub mod views;

pub use client::SodaClient;
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ConnectionConfig,
    PollingConfig, SanitizedConfig,
};
pub use endpoints::Endpoints;
pub use error::SodaError;
pub use importer::{BlueprintBuilder, Importer};
pub use model::{
    Blueprint, BlueprintColumn, ColumnGuess, Dataset, GeocodingStatus, PublicationStage,
    PublicationState, ScanResult, ScanSummary, SearchQuery, SearchResult, SearchResults,
    Translation,
};
pub use publication::{Publisher, GEOCODING_CHECK_INTERVAL};
pub use resolver::{InterruptHandle, LongRunningResolver, UNBOUNDED_ATTEMPTS};
pub use transport::{
    ApiRequest, AsyncTicket, HttpTransport, Method, Outcome, Payload, RequestBody, Transport,
};
pub use views::Views;
