//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::{ConnectionConfig, PollingConfig};
use crate::error::SodaError;

use super::{ApiRequest, AsyncTicket, Method, Outcome, Payload, RequestBody, Transport};

/// HTTP transport talking to a live service.
pub struct HttpTransport {
    client: Client,
    username: Option<String>,
    password: Option<String>,
    /// Used when a 202 carries no `Retry-After`.
    default_retry_delay: Duration,
}

impl HttpTransport {
    /// Create a new transport.
    pub fn new(connection: &ConnectionConfig, polling: &PollingConfig) -> Result<Self, SodaError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = connection.app_token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(token).map_err(|e| {
                SodaError::InvalidArgument(format!("app token is not a valid header: {}", e))
            })?;
            headers.insert("X-App-Token", value);
        }

        let client = Client::builder()
            .timeout(connection.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            username: connection.username.clone(),
            password: connection.password.clone(),
            default_retry_delay: polling.default_retry_delay(),
        })
    }

    fn build(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::File {
                content_type,
                bytes,
                ..
            } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Outcome<Payload>, SodaError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let response = self.build(&request).send().await?;
        let status = response.status();

        if status == StatusCode::ACCEPTED {
            let location = header_str(response.headers(), LOCATION);
            let retry_delay = header_str(response.headers(), RETRY_AFTER)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(self.default_retry_delay);
            let body = response.bytes().await?;

            let poll_location = poll_location(&request.url, location.as_deref(), &body)?;
            debug!(
                url = %request.url,
                poll_location = %poll_location,
                retry_delay_ms = retry_delay.as_millis() as u64,
                "Operation deferred by server"
            );
            return Ok(Outcome::Pending(AsyncTicket::new(poll_location, retry_delay)));
        }

        let body = response.bytes().await?;
        if status.is_success() {
            Ok(Outcome::Ready(Payload::new(body.to_vec())))
        } else {
            Err(service_error(status.as_u16(), &body))
        }
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct TicketBody {
    ticket: Option<String>,
}

/// Where to poll for a deferred request.
///
/// `Location` wins; otherwise the ticket id from the body is attached to the
/// request path.
fn poll_location(
    request_url: &str,
    location: Option<&str>,
    body: &[u8],
) -> Result<String, SodaError> {
    let mut base = Url::parse(request_url)
        .map_err(|e| SodaError::InvalidArgument(format!("invalid url '{}': {}", request_url, e)))?;

    if let Some(location) = location {
        return base
            .join(location)
            .map(String::from)
            .map_err(|e| SodaError::Decode(format!("invalid Location '{}': {}", location, e)));
    }

    let ticket = serde_json::from_slice::<TicketBody>(body)
        .ok()
        .and_then(|b| b.ticket);
    match ticket {
        Some(ticket) => {
            base.set_query(None);
            base.query_pairs_mut().append_pair("ticket", &ticket);
            Ok(base.into())
        }
        None => Err(SodaError::Decode(
            "202 response carried neither a Location header nor a ticket".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn service_error(status: u16, body: &[u8]) -> SodaError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { code, message }) if code.is_some() || message.is_some() => {
            SodaError::Service {
                status,
                code: code.unwrap_or_else(|| format!("http.{}", status)),
                message: message.unwrap_or_default(),
            }
        }
        _ => SodaError::service(status, String::from_utf8_lossy(body).trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_location_prefers_header() {
        let location = poll_location(
            "https://data.example.org/api/views/abcd-1234/publication",
            Some("/api/jobs/42"),
            br#"{"ticket":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(location, "https://data.example.org/api/jobs/42");
    }

    #[test]
    fn test_poll_location_absolute_header() {
        let location = poll_location(
            "https://data.example.org/api/imports2",
            Some("https://jobs.example.org/status/7"),
            b"",
        )
        .unwrap();
        assert_eq!(location, "https://jobs.example.org/status/7");
    }

    #[test]
    fn test_poll_location_from_ticket_replaces_query() {
        let location = poll_location(
            "https://data.example.org/api/imports2?method=scan&name=crimes.csv",
            None,
            br#"{"ticket":"t-99"}"#,
        )
        .unwrap();
        assert_eq!(location, "https://data.example.org/api/imports2?ticket=t-99");
    }

    #[test]
    fn test_poll_location_missing_everything() {
        let result = poll_location("https://data.example.org/api/imports2", None, b"{}");
        assert!(matches!(result, Err(SodaError::Decode(_))));
    }

    #[test]
    fn test_service_error_with_code_and_message() {
        let err = service_error(400, br#"{"code":"invalid_request","message":"bad blueprint"}"#);
        match err {
            SodaError::Service {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "invalid_request");
                assert_eq!(message, "bad blueprint");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_service_error_plain_text() {
        let err = service_error(502, b"Bad Gateway\n");
        match err {
            SodaError::Service { code, message, .. } => {
                assert_eq!(code, "http.502");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_bad_app_token() {
        let mut connection = ConnectionConfig::new("https://data.example.org");
        connection.app_token = Some("bad\ntoken".to_string());
        let result = HttpTransport::new(&connection, &PollingConfig::default());
        assert!(matches!(result, Err(SodaError::InvalidArgument(_))));
    }
}
