//! Dataset (view) CRUD and search.

use tracing::{debug, info};

use crate::endpoints::Endpoints;
use crate::error::SodaError;
use crate::model::{Dataset, SearchQuery, SearchResults};
use crate::resolver::LongRunningResolver;
use crate::transport::{ApiRequest, Payload};

/// Plain create/read/update/delete on views. Deferred writes are resolved
/// with the bounded budget.
#[derive(Clone)]
pub struct Views {
    resolver: LongRunningResolver,
    endpoints: Endpoints,
    max_attempts: u32,
}

impl Views {
    pub fn new(resolver: LongRunningResolver, endpoints: Endpoints, max_attempts: u32) -> Self {
        Self {
            resolver,
            endpoints,
            max_attempts,
        }
    }

    /// Create an empty, unpublished dataset. `view.id` must not be set.
    pub async fn create_view(&self, view: &Dataset) -> Result<Dataset, SodaError> {
        if let Some(id) = &view.id {
            return Err(SodaError::InvalidArgument(format!(
                "cannot create a view that already has id '{}'",
                id
            )));
        }

        let request = ApiRequest::post_json(self.endpoints.views(), view)?;
        let created: Dataset = self.resolver.call_json(request, self.max_attempts).await?;

        info!(
            dataset_id = created.id.as_deref().unwrap_or("<none>"),
            name = %created.name,
            "View created"
        );
        Ok(created)
    }

    pub async fn load_view(&self, id: &str) -> Result<Dataset, SodaError> {
        debug!(dataset_id = id, "Loading view");
        let request = ApiRequest::get(self.endpoints.view(id));
        self.resolver.call_json(request, self.max_attempts).await
    }

    /// Replace a view's metadata. `view.id` is required.
    pub async fn update_view(&self, view: &Dataset) -> Result<Dataset, SodaError> {
        let id = view.require_id()?;
        let request = ApiRequest::put_json(self.endpoints.view(id), view)?;
        self.resolver.call_json(request, self.max_attempts).await
    }

    pub async fn delete_view(&self, id: &str) -> Result<(), SodaError> {
        let request = ApiRequest::delete(self.endpoints.view(id));
        self.resolver
            .call(request, self.max_attempts, |_: &Payload| Ok(()))
            .await?;

        info!(dataset_id = id, "View deleted");
        Ok(())
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, SodaError> {
        debug!(query = %query.text, page = query.page, "Searching views");
        let request = ApiRequest::get(self.endpoints.search(query));
        self.resolver.call_json(request, self.max_attempts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockTransport};
    use crate::transport::{AsyncTicket, Method, RequestBody};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn views(transport: &MockTransport) -> Views {
        Views::new(
            LongRunningResolver::new(Arc::new(transport.clone())),
            Endpoints::new("https://data.example.org"),
            3,
        )
    }

    #[tokio::test]
    async fn test_create_view_posts_json() {
        let transport = MockTransport::new();
        transport.push_ready(&fixtures::dataset("abcd-1234", "Crimes")).await;

        let created = views(&transport)
            .create_view(&Dataset::new("Crimes", "Reported crimes"))
            .await
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("abcd-1234"));

        let requests = transport.recorded_requests().await;
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://data.example.org/api/views");
        match &requests[0].body {
            RequestBody::Json(body) => {
                assert_eq!(body["name"], "Crimes");
                assert!(body.get("id").is_none());
            }
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_view_rejects_existing_id() {
        let transport = MockTransport::new();
        let result = views(&transport)
            .create_view(&fixtures::dataset("abcd-1234", "Crimes"))
            .await;
        assert!(matches!(result, Err(SodaError::InvalidArgument(_))));
        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_view_requires_id() {
        let transport = MockTransport::new();
        let result = views(&transport)
            .update_view(&Dataset::new("Crimes", ""))
            .await;
        assert!(matches!(result, Err(SodaError::InvalidArgument(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_view_resolves_deferral() {
        let transport = MockTransport::new();
        transport
            .push_pending(AsyncTicket::new(
                "https://data.example.org/api/views/abcd-1234?ticket=u1",
                Duration::from_secs(2),
            ))
            .await;
        let mut updated = fixtures::dataset("abcd-1234", "Crimes (renamed)");
        updated.description = Some("updated".to_string());
        transport.push_ready(&updated).await;

        let result = views(&transport).update_view(&updated).await.unwrap();
        assert_eq!(result, updated);

        let requests = transport.recorded_requests().await;
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[0].url, "https://data.example.org/api/views/abcd-1234");
        assert_eq!(requests[1].method, Method::Get);
    }

    #[tokio::test]
    async fn test_load_missing_view() {
        let transport = MockTransport::new();
        transport
            .push_error(SodaError::Service {
                status: 404,
                code: "not_found".to_string(),
                message: "Cannot find view with id zzzz-0000".to_string(),
            })
            .await;

        let result = views(&transport).load_view("zzzz-0000").await;
        assert!(matches!(result, Err(SodaError::Service { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_delete_view_ignores_body() {
        let transport = MockTransport::new();
        transport.push_ready_raw(Vec::new()).await;

        views(&transport).delete_view("abcd-1234").await.unwrap();
        let requests = transport.recorded_requests().await;
        assert_eq!(requests[0], ApiRequest::delete("https://data.example.org/api/views/abcd-1234"));
    }

    #[tokio::test]
    async fn test_search() {
        let transport = MockTransport::new();
        transport
            .push_ready(&json!({
                "count": 1,
                "results": [{"totalRows": 3, "view": {"id": "abcd-1234", "name": "Crimes"}}]
            }))
            .await;

        let results = views(&transport)
            .search(&SearchQuery::new("crimes").with_limit(5))
            .await
            .unwrap();

        assert_eq!(results.count, 1);
        assert_eq!(results.results[0].total_rows, 3);
        let requests = transport.recorded_requests().await;
        assert_eq!(
            requests[0].url,
            "https://data.example.org/api/search/views?q=crimes&limit=5&page=1"
        );
    }
}
