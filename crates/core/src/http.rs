//! HTTP port used by the pipeline and the dispatcher.
//!
//! The core never talks to a concrete client. Adapters implement
//! [`HttpTransport`] and translate their own failures into
//! [`TransportError`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use beacon_common::error::{ErrorClassification, ErrorSeverity};
use beacon_domain::BeaconError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// HTTP verbs the platform API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload. Form bodies are sent url-encoded, JSON bodies as
/// `application/json`.
#[derive(Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

// Form values are credentials; only the field names are printed.
impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Form(fields) => f
                .debug_tuple("Form")
                .field(&fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// A fully resolved request, ready for a transport.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: RequestBody::Empty }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn with_form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body =
            RequestBody::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Value of a form field, if the body is a form.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(fields) => {
                fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
            }
            _ => None,
        }
    }

    /// Path component of the URL, without query string.
    pub fn path(&self) -> &str {
        let without_scheme = self.url.split_once("://").map_or(self.url.as_str(), |(_, rest)| rest);
        let path = without_scheme.find('/').map_or("/", |idx| &without_scheme[idx..]);
        path.split_once('?').map_or(path, |(path, _)| path)
    }
}

// Headers and form fields carry tokens and passwords.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("header_count", &self.headers.len())
            .field("body", &self.body)
            .finish()
    }
}

/// Raw response: status code and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Deserialize the body.
    ///
    /// # Errors
    /// Returns `BeaconError::Parse` when the body is not a `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, BeaconError> {
        serde_json::from_slice(&self.body).map_err(|e| BeaconError::Parse(e.to_string()))
    }

    /// The body as JSON, or `None` if it is not JSON.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// The `error` string of an error body such as `{"error": "invalid_request"}`.
    pub fn error_code(&self) -> Option<String> {
        self.json_body()?.get("error")?.as_str().map(str::to_owned)
    }
}

/// Failure below the HTTP layer: no response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network unreachable: {0}")]
    Offline(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport failure: {0}")]
    Other(String),
}

impl ErrorClassification for TransportError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Offline(_) | Self::Timeout(_) => ErrorSeverity::Warning,
            Self::Other(_) => ErrorSeverity::Error,
        }
    }
}

// The caller-facing taxonomy has a single connectivity variant.
impl From<TransportError> for BeaconError {
    fn from(_: TransportError) -> Self {
        Self::NetworkOffline
    }
}

/// Executes one HTTP exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return whatever the server answered, including
    /// non-2xx statuses.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
