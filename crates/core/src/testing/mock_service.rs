//! In-memory simulation of the dataset service for lifecycle tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::SodaError;
use crate::model::{
    Blueprint, ColumnGuess, Dataset, GeocodingStatus, PublicationStage, ScanResult, ScanSummary,
    SearchResult, SearchResults,
};
use crate::transport::{ApiRequest, AsyncTicket, Method, Outcome, Payload, RequestBody, Transport};

/// Operations the simulated service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockRoute {
    Scan,
    Commit,
    CreateView,
    LoadView,
    UpdateView,
    DeleteView,
    Publish,
    WorkingCopy,
    PendingGeocoding,
    Search,
}

#[derive(Debug, Clone)]
struct StoredDataset {
    view: Dataset,
    rows: usize,
}

#[derive(Debug, Clone, Copy)]
struct GeocodingBacklog {
    pending: u64,
    /// The check with this number (1-based) is the first to report zero.
    clears_at_check: u32,
    checks: u32,
}

impl GeocodingBacklog {
    fn current(&self) -> u64 {
        if self.checks >= self.clears_at_check {
            0
        } else {
            self.pending
        }
    }
}

#[derive(Debug, Clone)]
struct DeferredJob {
    route: MockRoute,
    id: Option<String>,
    request: ApiRequest,
    remaining_polls: u32,
    retry_delay: Duration,
}

#[derive(Debug, Default)]
struct ServiceState {
    datasets: HashMap<String, StoredDataset>,
    /// Uploaded file id -> non-empty line count.
    uploads: HashMap<String, usize>,
    geocoding: HashMap<String, GeocodingBacklog>,
    deferrals: HashMap<MockRoute, (u32, Duration)>,
    jobs: HashMap<String, DeferredJob>,
    next_error: Option<SodaError>,
    requests: Vec<ApiRequest>,
    polls: usize,
}

enum Target {
    Route(MockRoute, Option<String>),
    Job(String),
}

/// Simulated dataset service implementing [`Transport`].
///
/// Provides controllable behavior for testing:
/// - Deferred ("202") answers for a chosen operation, completed through
///   polling like the real service
/// - Geocoding backlogs that clear after a set number of status checks
/// - Error injection and request recording
///
/// CSV uploads are split naively on commas and newlines.
#[derive(Debug, Clone)]
pub struct MockSodaService {
    api_root: String,
    state: Arc<RwLock<ServiceState>>,
}

impl MockSodaService {
    /// `domain` must match the client's `connection.url`.
    pub fn new(domain: &str) -> Self {
        Self {
            api_root: format!("{}/api", domain.trim_end_matches('/')),
            state: Arc::new(RwLock::new(ServiceState::default())),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Answer the next `route` request with a ticket; the ticket's location
    /// reports pending `pending_polls` more times before completing.
    pub async fn defer(&self, route: MockRoute, pending_polls: u32, retry_delay: Duration) {
        self.state
            .write()
            .await
            .deferrals
            .insert(route, (pending_polls, retry_delay));
    }

    /// Give `dataset_id` a geocoding backlog that the `clears_at_check`-th
    /// status check reports as drained.
    pub async fn set_pending_geocodes(&self, dataset_id: &str, pending: u64, clears_at_check: u32) {
        self.state.write().await.geocoding.insert(
            dataset_id.to_string(),
            GeocodingBacklog {
                pending,
                clears_at_check,
                checks: 0,
            },
        );
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: SodaError) {
        self.state.write().await.next_error = Some(error);
    }

    /// Seed a dataset; returns its id.
    pub async fn insert_dataset(&self, mut view: Dataset, rows: usize) -> String {
        let id = view.id.clone().unwrap_or_else(new_view_id);
        view.id = Some(id.clone());
        self.state
            .write()
            .await
            .datasets
            .insert(id.clone(), StoredDataset { view, rows });
        id
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub async fn dataset(&self, id: &str) -> Option<Dataset> {
        self.state.read().await.datasets.get(id).map(|d| d.view.clone())
    }

    /// Rows stored for a dataset.
    pub async fn row_count(&self, id: &str) -> Option<usize> {
        self.state.read().await.datasets.get(id).map(|d| d.rows)
    }

    pub async fn dataset_count(&self) -> usize {
        self.state.read().await.datasets.len()
    }

    pub async fn geocoding_checks(&self, dataset_id: &str) -> u32 {
        self.state
            .read()
            .await
            .geocoding
            .get(dataset_id)
            .map(|b| b.checks)
            .unwrap_or(0)
    }

    /// Number of job polls served.
    pub async fn poll_count(&self) -> usize {
        self.state.read().await.polls
    }

    pub async fn recorded_requests(&self) -> Vec<ApiRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}", self.api_root, job_id)
    }

    fn target(&self, request: &ApiRequest) -> Result<Target, SodaError> {
        let path = request
            .url
            .strip_prefix(&self.api_root)
            .ok_or_else(|| not_found(&request.url))?;
        let path = path.split('?').next().unwrap_or_default();
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();
        let method = query_param(&request.url, "method");

        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let target = match (request.method, segments.as_slice()) {
            (Method::Get, ["jobs", job_id]) => Target::Job(job_id.to_string()),
            (Method::Post, ["imports2"]) if method.as_deref() == Some("scan") => {
                Target::Route(MockRoute::Scan, None)
            }
            (Method::Post, ["imports2"]) => Target::Route(MockRoute::Commit, None),
            (Method::Post, ["views"]) => Target::Route(MockRoute::CreateView, None),
            (Method::Get, ["views", id]) => Target::Route(MockRoute::LoadView, Some(id.to_string())),
            (Method::Put, ["views", id]) => {
                Target::Route(MockRoute::UpdateView, Some(id.to_string()))
            }
            (Method::Delete, ["views", id]) => {
                Target::Route(MockRoute::DeleteView, Some(id.to_string()))
            }
            (Method::Post, ["views", id, "publication"]) if method.as_deref() == Some("copy") => {
                Target::Route(MockRoute::WorkingCopy, Some(id.to_string()))
            }
            (Method::Post, ["views", id, "publication"]) => {
                Target::Route(MockRoute::Publish, Some(id.to_string()))
            }
            (Method::Get, ["geocoding", id]) => {
                Target::Route(MockRoute::PendingGeocoding, Some(id.to_string()))
            }
            (Method::Get, ["search", "views"]) => Target::Route(MockRoute::Search, None),
            _ => return Err(not_found(&request.url)),
        };
        Ok(target)
    }
}

#[async_trait]
impl Transport for MockSodaService {
    async fn execute(&self, request: ApiRequest) -> Result<Outcome<Payload>, SodaError> {
        let mut state = self.state.write().await;
        state.requests.push(request.clone());

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        match self.target(&request)? {
            Target::Job(job_id) => {
                state.polls += 1;
                match state.jobs.remove(&job_id) {
                    None => Err(not_found(&request.url)),
                    Some(mut job) if job.remaining_polls > 0 => {
                        job.remaining_polls -= 1;
                        let ticket = AsyncTicket::new(self.job_url(&job_id), job.retry_delay);
                        state.jobs.insert(job_id, job);
                        Ok(Outcome::Pending(ticket))
                    }
                    Some(job) => state
                        .handle(job.route, job.id.as_deref(), &job.request)
                        .map(Outcome::Ready),
                }
            }
            Target::Route(route, id) => {
                if let Some((pending_polls, retry_delay)) = state.deferrals.remove(&route) {
                    let job_id = Uuid::new_v4().simple().to_string();
                    state.jobs.insert(
                        job_id.clone(),
                        DeferredJob {
                            route,
                            id,
                            request,
                            remaining_polls: pending_polls,
                            retry_delay,
                        },
                    );
                    return Ok(Outcome::Pending(AsyncTicket::new(
                        self.job_url(&job_id),
                        retry_delay,
                    )));
                }
                state.handle(route, id.as_deref(), &request).map(Outcome::Ready)
            }
        }
    }
}

impl ServiceState {
    fn handle(
        &mut self,
        route: MockRoute,
        id: Option<&str>,
        request: &ApiRequest,
    ) -> Result<Payload, SodaError> {
        let id = id.unwrap_or_default();
        match route {
            MockRoute::Scan => self.scan(request),
            MockRoute::Commit => self.commit(request),
            MockRoute::CreateView => {
                let mut view: Dataset = json_body(request)?;
                let view_id = new_view_id();
                view.id = Some(view_id.clone());
                view.publication_stage = PublicationStage::Unpublished;
                view.created_at = Some(Utc::now());
                self.datasets.insert(
                    view_id,
                    StoredDataset {
                        view: view.clone(),
                        rows: 0,
                    },
                );
                Payload::json(&view)
            }
            MockRoute::LoadView => Payload::json(&self.stored(id)?.view),
            MockRoute::UpdateView => {
                let update: Dataset = json_body(request)?;
                let stored = self.stored_mut(id)?;
                stored.view.name = update.name;
                stored.view.description = update.description;
                Payload::json(&stored.view)
            }
            MockRoute::DeleteView => {
                self.datasets
                    .remove(id)
                    .ok_or_else(|| not_found(&request.url))?;
                Ok(Payload::empty())
            }
            MockRoute::Publish => self.publish(id),
            MockRoute::WorkingCopy => self.working_copy(id),
            MockRoute::PendingGeocoding => {
                let pending = match self.geocoding.get_mut(id) {
                    Some(backlog) => {
                        backlog.checks += 1;
                        backlog.current()
                    }
                    None => 0,
                };
                Payload::json(&GeocodingStatus {
                    pending_count: pending,
                })
            }
            MockRoute::Search => self.search(request),
        }
    }

    fn stored(&self, id: &str) -> Result<&StoredDataset, SodaError> {
        self.datasets.get(id).ok_or_else(|| missing_view(id))
    }

    fn stored_mut(&mut self, id: &str) -> Result<&mut StoredDataset, SodaError> {
        self.datasets.get_mut(id).ok_or_else(|| missing_view(id))
    }

    fn scan(&mut self, request: &ApiRequest) -> Result<Payload, SodaError> {
        let RequestBody::File { bytes, .. } = &request.body else {
            return Err(bad_request("scan expects a file upload"));
        };
        let text = String::from_utf8_lossy(bytes);
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .collect();

        let first_values: Vec<&str> = lines.get(1).map(|l| l.split(',').collect()).unwrap_or_default();
        let columns = lines
            .first()
            .map(|header| {
                header
                    .split(',')
                    .enumerate()
                    .map(|(i, name)| ColumnGuess {
                        name: name.trim().to_string(),
                        suggestion: guess_type(first_values.get(i).copied()),
                        processor: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let file_id = Uuid::new_v4().simple().to_string();
        self.uploads.insert(file_id.clone(), lines.len());

        Payload::json(&ScanResult {
            file_id,
            summary: ScanSummary {
                columns,
                headers: 1,
            },
        })
    }

    fn commit(&mut self, request: &ApiRequest) -> Result<Payload, SodaError> {
        let field = |key: &str| {
            request
                .form_value(key)
                .ok_or_else(|| bad_request(&format!("missing form field '{}'", key)))
        };
        let file_id = field("fileId")?;
        let blueprint: Blueprint = serde_json::from_str(field("blueprint")?)
            .map_err(|e| bad_request(&format!("invalid blueprint: {}", e)))?;
        let translation: Vec<String> = serde_json::from_str(field("translation")?)
            .map_err(|e| bad_request(&format!("invalid translation: {}", e)))?;

        if translation.len() != blueprint.columns.len() {
            return Err(bad_request(&format!(
                "translation has {} entries but blueprint has {} columns",
                translation.len(),
                blueprint.columns.len()
            )));
        }
        let lines = *self
            .uploads
            .get(file_id)
            .ok_or_else(|| bad_request(&format!("unknown file '{}'", file_id)))?;

        let view = Dataset {
            id: Some(new_view_id()),
            name: blueprint.name,
            description: Some(blueprint.description),
            publication_stage: PublicationStage::Unpublished,
            created_at: Some(Utc::now()),
            ..Default::default()
        };
        let rows = lines.saturating_sub(blueprint.skip_rows as usize);
        let view_id = view.id.clone().unwrap_or_default();
        self.datasets.insert(
            view_id,
            StoredDataset {
                view: view.clone(),
                rows,
            },
        );
        Payload::json(&view)
    }

    fn publish(&mut self, id: &str) -> Result<Payload, SodaError> {
        if self.geocoding.get(id).is_some_and(|b| b.current() > 0) {
            return Err(SodaError::Service {
                status: 400,
                code: "geocoding_pending".to_string(),
                message: format!("{} has outstanding geocoding requests", id),
            });
        }

        let stored = self.stored(id)?;
        if stored.view.publication_stage != PublicationStage::Unpublished {
            return Err(bad_request(&format!("{} is not unpublished", id)));
        }
        let original = stored.view.published_view_uid.clone();

        if let Some(original) = original {
            if let Some(previous) = self.datasets.get_mut(&original) {
                previous.view.publication_stage = PublicationStage::Snapshotted;
            }
        }

        let stored = self.stored_mut(id)?;
        stored.view.publication_stage = PublicationStage::Published;
        stored.view.published_view_uid = None;
        stored.view.publication_date = Some(Utc::now());
        Payload::json(&stored.view)
    }

    fn working_copy(&mut self, id: &str) -> Result<Payload, SodaError> {
        let stored = self.stored(id)?;
        if stored.view.publication_stage != PublicationStage::Published {
            return Err(bad_request(&format!("{} is not published", id)));
        }

        let copy = Dataset {
            id: Some(new_view_id()),
            name: stored.view.name.clone(),
            description: stored.view.description.clone(),
            publication_stage: PublicationStage::Unpublished,
            published_view_uid: Some(id.to_string()),
            created_at: Some(Utc::now()),
            publication_date: None,
        };
        let rows = stored.rows;
        let copy_id = copy.id.clone().unwrap_or_default();
        self.datasets.insert(
            copy_id,
            StoredDataset {
                view: copy.clone(),
                rows,
            },
        );
        Payload::json(&copy)
    }

    fn search(&self, request: &ApiRequest) -> Result<Payload, SodaError> {
        let text = query_param(&request.url, "q").unwrap_or_default().to_lowercase();
        let limit = query_param(&request.url, "limit")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(20);
        let page = query_param(&request.url, "page")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);

        let mut matches: Vec<&StoredDataset> = self
            .datasets
            .values()
            .filter(|d| d.view.name.to_lowercase().contains(&text))
            .collect();
        matches.sort_by(|a, b| a.view.id.cmp(&b.view.id));

        let results = matches
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .map(|d| SearchResult {
                total_rows: d.rows as u64,
                view: d.view.clone(),
            })
            .collect();

        Payload::json(&SearchResults {
            count: matches.len() as u64,
            results,
        })
    }
}

fn json_body<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<T, SodaError> {
    match &request.body {
        RequestBody::Json(value) => serde_json::from_value(value.clone())
            .map_err(|e| bad_request(&format!("invalid json body: {}", e))),
        _ => Err(bad_request("expected a json body")),
    }
}

fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Four-by-four identifier, e.g. "a1b2-c3d4".
fn new_view_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", &hex[0..4], &hex[4..8])
}

fn guess_type(sample: Option<&str>) -> String {
    match sample {
        Some(value) if value.trim().parse::<f64>().is_ok() => "number".to_string(),
        _ => "text".to_string(),
    }
}

fn bad_request(message: &str) -> SodaError {
    SodaError::Service {
        status: 400,
        code: "invalid_request".to_string(),
        message: message.to_string(),
    }
}

fn not_found(url: &str) -> SodaError {
    SodaError::Service {
        status: 404,
        code: "not_found".to_string(),
        message: format!("no route for {}", url),
    }
}

fn missing_view(id: &str) -> SodaError {
    SodaError::Service {
        status: 404,
        code: "not_found".to_string(),
        message: format!("Cannot find view with id {}", id),
    }
}
