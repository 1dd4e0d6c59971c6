//! Request and response values exchanged with a [`super::Transport`].

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SodaError;

/// A pending server-side operation: where to poll and how long to wait first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncTicket {
    /// Absolute URL to GET for the operation's result.
    pub poll_location: String,
    /// Server-suggested wait before the next poll.
    pub retry_delay: Duration,
}

impl AsyncTicket {
    pub fn new(poll_location: impl Into<String>, retry_delay: Duration) -> Self {
        Self {
            poll_location: poll_location.into(),
            retry_delay,
        }
    }
}

/// Result of a request the service may not have finished yet.
///
/// Hard failures travel in the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Definitive response.
    Ready(T),
    /// The service is still working; poll the ticket.
    Pending(AsyncTicket),
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending(_))
    }

    /// Transform the ready value, leaving a pending ticket untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::Pending(ticket) => Outcome::Pending(ticket),
        }
    }

    /// Fallible version of [`Outcome::map`].
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Outcome<U>, E> {
        match self {
            Outcome::Ready(value) => f(value).map(Outcome::Ready),
            Outcome::Pending(ticket) => Ok(Outcome::Pending(ticket)),
        }
    }
}

/// Raw body of a definitive response.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Serialize `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, SodaError> {
        Ok(Self(serde_json::to_vec(value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SodaError> {
        if self.0.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.0)?)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

/// HTTP verbs used against the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` pairs, in order.
    Form(Vec<(String, String)>),
    /// Raw file upload.
    File {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// A single request to issue through a [`super::Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    /// POST without a body.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json<T: Serialize + ?Sized>(
        url: impl Into<String>,
        body: &T,
    ) -> Result<Self, SodaError> {
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::Json(serde_json::to_value(body)?),
        })
    }

    pub fn put_json<T: Serialize + ?Sized>(
        url: impl Into<String>,
        body: &T,
    ) -> Result<Self, SodaError> {
        Ok(Self {
            method: Method::Put,
            url: url.into(),
            body: RequestBody::Json(serde_json::to_value(body)?),
        })
    }

    pub fn post_form(url: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::Form(pairs),
        }
    }

    pub fn post_file(
        url: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                bytes,
            },
        }
    }

    /// Value of a form field, if this is a form request.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}
