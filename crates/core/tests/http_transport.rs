//! HTTP transport tests against an in-process axum server.
//!
//! Covers the wire classification of responses:
//! - 2xx bodies returned as ready payloads
//! - 202 answers turned into tickets (Location or ticket body)
//! - Error bodies decoded into service errors
//! - Form and raw file bodies, credentials and the app token header

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use sodaport_core::{
    ApiRequest, Config, ConnectionConfig, HttpTransport, Outcome, PollingConfig, SodaClient,
    SodaError, Transport,
};

const APP_TOKEN: &str = "test-app-token";

/// Serve the fake API on an ephemeral port; returns the domain root.
async fn spawn_server() -> String {
    let router = Router::new()
        .route("/api/views/{id}", get(load_view).delete(delete_view))
        .route(
            "/api/views/{id}/publication",
            get(poll_publication).post(publish),
        )
        .route("/api/geocoding/{id}", get(pending_geocoding))
        .route("/api/imports2", post(imports))
        .route("/api/jobs/{job}", get(job));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    format!("http://{}", addr)
}

fn config(domain: &str) -> Config {
    let mut connection = ConnectionConfig::new(domain);
    connection.username = Some("publisher@example.org".to_string());
    connection.password = Some("secret".to_string());
    connection.app_token = Some(APP_TOKEN.to_string());
    connection.timeout_secs = 5;

    Config {
        connection,
        polling: PollingConfig {
            max_attempts: 3,
            default_retry_delay_ms: 10,
            geocoding_interval_secs: 1,
        },
    }
}

fn transport(domain: &str) -> HttpTransport {
    let config = config(domain);
    HttpTransport::new(&config.connection, &config.polling).expect("Failed to build transport")
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn view(id: &str, stage: &str) -> Json<serde_json::Value> {
    Json(json!({ "id": id, "name": "Crimes", "publicationStage": stage }))
}

async fn load_view(Path(id): Path<String>, headers: HeaderMap) -> Response {
    let token = headers.get("x-app-token").and_then(|v| v.to_str().ok());
    if token != Some(APP_TOKEN) {
        return error(StatusCode::FORBIDDEN, "authentication_required", "missing app token");
    }
    match id.as_str() {
        "missing" => error(
            StatusCode::NOT_FOUND,
            "not_found",
            "Cannot find view with id missing",
        ),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        _ => view(&id, "unpublished").into_response(),
    }
}

async fn delete_view(Path(_id): Path<String>) -> StatusCode {
    StatusCode::OK
}

async fn pending_geocoding(
    Path(_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("method").map(String::as_str) != Some("pending") {
        return error(StatusCode::BAD_REQUEST, "invalid_request", "unknown method");
    }
    Json(json!({ "total": 0 })).into_response()
}

async fn publish(Path(_id): Path<String>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "authentication_required", "login required");
    }
    (StatusCode::ACCEPTED, Json(json!({ "ticket": "t-9" }))).into_response()
}

async fn poll_publication(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match query.get("ticket").map(String::as_str) {
        Some("t-9") => view(&id, "published").into_response(),
        _ => error(StatusCode::BAD_REQUEST, "invalid_request", "unknown ticket"),
    }
}

/// Scan uploads are deferred via `Location`; commits echo their form.
async fn imports(
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if query.get("method").map(String::as_str) == Some("scan") {
        if content_type != "text/csv" || body.is_empty() {
            return error(StatusCode::BAD_REQUEST, "invalid_request", "expected csv upload");
        }
        return (
            StatusCode::ACCEPTED,
            [(header::LOCATION, "/api/jobs/scan-1"), (header::RETRY_AFTER, "2")],
        )
            .into_response();
    }

    let url = format!("http://form.local/?{}", String::from_utf8_lossy(&body));
    let form: HashMap<String, String> = reqwest::Url::parse(&url)
        .map(|u| u.query_pairs().into_owned().collect())
        .unwrap_or_default();
    Json(json!({ "contentType": content_type, "form": form })).into_response()
}

async fn job(Path(job): Path<String>) -> Json<serde_json::Value> {
    Json(json!({ "fileId": format!("file-for-{}", job), "summary": { "columns": [] } }))
}

#[tokio::test]
async fn test_ready_response_carries_body_and_token() {
    let domain = spawn_server().await;
    let transport = transport(&domain);

    let outcome = transport
        .execute(ApiRequest::get(format!("{}/api/views/abcd-1234", domain)))
        .await
        .unwrap();

    let Outcome::Ready(payload) = outcome else {
        panic!("expected a ready response");
    };
    let body: serde_json::Value = payload.decode().unwrap();
    assert_eq!(body["id"], "abcd-1234");
}

#[tokio::test]
async fn test_missing_app_token_is_rejected() {
    let domain = spawn_server().await;
    let mut config = config(&domain);
    config.connection.app_token = None;
    let transport = HttpTransport::new(&config.connection, &config.polling).unwrap();

    let result = transport
        .execute(ApiRequest::get(format!("{}/api/views/abcd-1234", domain)))
        .await;

    match result {
        Err(SodaError::Service { status, code, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(code, "authentication_required");
        }
        other => panic!("expected a service error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_accepted_with_location_becomes_ticket() {
    let domain = spawn_server().await;
    let transport = transport(&domain);

    let outcome = transport
        .execute(ApiRequest::post_file(
            format!("{}/api/imports2?method=scan&name=crimes.csv", domain),
            "crimes.csv",
            "text/csv",
            b"ID,Type\n1,Theft\n".to_vec(),
        ))
        .await
        .unwrap();

    let Outcome::Pending(ticket) = outcome else {
        panic!("expected a deferred response");
    };
    assert_eq!(ticket.poll_location, format!("{}/api/jobs/scan-1", domain));
    assert_eq!(ticket.retry_delay, Duration::from_secs(2));
}

#[tokio::test]
async fn test_form_body_is_url_encoded() {
    let domain = spawn_server().await;
    let transport = transport(&domain);
    let blueprint = r#"{"name":"Crimes & Co","columns":[]}"#;

    let outcome = transport
        .execute(ApiRequest::post_form(
            format!("{}/api/imports2", domain),
            vec![
                ("translation".to_string(), "[]".to_string()),
                ("fileId".to_string(), "f-1".to_string()),
                ("blueprint".to_string(), blueprint.to_string()),
            ],
        ))
        .await
        .unwrap();

    let Outcome::Ready(payload) = outcome else {
        panic!("expected a ready response");
    };
    let body: serde_json::Value = payload.decode().unwrap();
    assert_eq!(body["contentType"], "application/x-www-form-urlencoded");
    assert_eq!(body["form"]["fileId"], "f-1");
    assert_eq!(body["form"]["blueprint"], blueprint);
}

#[tokio::test]
async fn test_error_body_decoded_into_service_error() {
    let domain = spawn_server().await;
    let transport = transport(&domain);

    let result = transport
        .execute(ApiRequest::get(format!("{}/api/views/missing", domain)))
        .await;

    match result {
        Err(SodaError::Service {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 404);
            assert_eq!(code, "not_found");
            assert_eq!(message, "Cannot find view with id missing");
        }
        other => panic!("expected a service error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_error_body_keeps_text() {
    let domain = spawn_server().await;
    let transport = transport(&domain);

    let result = transport
        .execute(ApiRequest::get(format!("{}/api/views/broken", domain)))
        .await;

    match result {
        Err(SodaError::Service {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 500);
            assert_eq!(code, "http.500");
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected a service error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_service_is_connection_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let domain = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let transport = transport(&domain);

    let result = transport
        .execute(ApiRequest::get(format!("{}/api/views/abcd-1234", domain)))
        .await;

    assert!(result.unwrap_err().is_transport_fault());
}

#[tokio::test]
async fn test_client_publishes_through_ticket_body() {
    let domain = spawn_server().await;
    let client = SodaClient::from_config(&config(&domain)).unwrap();

    let published = client.publisher().publish("abcd-1234").await.unwrap();

    assert!(published.is_published());
    assert_eq!(published.id.as_deref(), Some("abcd-1234"));
}

#[tokio::test]
async fn test_client_scan_resolves_location_ticket() {
    let domain = spawn_server().await;
    let client = SodaClient::from_config(&config(&domain)).unwrap();
    let dir = tempfile::TempDir::new().unwrap();
    let csv = dir.path().join("crimes.csv");
    std::fs::write(&csv, "ID,Type\n1,Theft\n").unwrap();

    let scan = client.importer().scan(&csv).await.unwrap();

    assert_eq!(scan.file_id, "file-for-scan-1");
}

#[tokio::test]
async fn test_client_delete_accepts_empty_body() {
    let domain = spawn_server().await;
    let client = SodaClient::from_config(&config(&domain)).unwrap();

    client.views().delete_view("abcd-1234").await.unwrap();
}
