//! What to send, and how to read what comes back.

use std::marker::PhantomData;

use beacon_domain::{BeaconError, Module, PlatformConfig, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::form_urlencoded;

use crate::http::{HttpMethod, HttpRequest};

/// An immutable description of one platform call.
///
/// Retries share the same descriptor; the bearer token is attached per
/// attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub module: Module,
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(module: Module, method: HttpMethod, path: impl Into<String>) -> Self {
        Self { module, method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(module: Module, path: impl Into<String>) -> Self {
        Self::new(module, HttpMethod::Get, path)
    }

    pub fn post(module: Module, path: impl Into<String>) -> Self {
        Self::new(module, HttpMethod::Post, path)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Absolute URL including the encoded query string.
    pub fn url(&self, config: &PlatformConfig) -> String {
        let base = config.endpoint_url(self.module, &self.path);
        if self.query.is_empty() {
            return base;
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        format!("{base}?{query}")
    }

    /// Build the request for one attempt.
    pub fn to_request(&self, config: &PlatformConfig, access_token: Option<&str>) -> HttpRequest {
        let mut request = HttpRequest::new(self.method, self.url(config));
        if let Some(token) = access_token {
            request = request.with_bearer(token);
        }
        if let Some(body) = &self.body {
            request = request.with_json(body.clone());
        }
        request
    }
}

/// Body of a successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    status: u16,
    bytes: Vec<u8>,
}

impl ResponseBody {
    pub fn new(status: u16, bytes: Vec<u8>) -> Self {
        Self { status, bytes }
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// # Errors
    /// Returns `BeaconError::Parse` when the body is not a `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.bytes).map_err(|e| BeaconError::Parse(e.to_string()))
    }
}

/// Turns a successful response into a domain value.
///
/// Implementations report a body of the wrong shape as
/// `BeaconError::Parse`. Any closure `Fn(&ResponseBody) -> Result<T>` is a
/// parser.
pub trait ResponseParser<T>: Send + Sync {
    /// # Errors
    /// Returns `BeaconError::Parse` when the body does not have the expected
    /// shape.
    fn parse(&self, body: &ResponseBody) -> Result<T>;
}

impl<T, F> ResponseParser<T> for F
where
    F: Fn(&ResponseBody) -> Result<T> + Send + Sync,
{
    fn parse(&self, body: &ResponseBody) -> Result<T> {
        self(body)
    }
}

/// Parser returning the body unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBody;

impl ResponseParser<ResponseBody> for RawBody {
    fn parse(&self, body: &ResponseBody) -> Result<ResponseBody> {
        Ok(body.clone())
    }
}

/// Parser deserializing the whole body as JSON.
pub struct JsonParser<T>(PhantomData<fn() -> T>);

impl<T> JsonParser<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResponseParser<T> for JsonParser<T> {
    fn parse(&self, body: &ResponseBody) -> Result<T> {
        body.json()
    }
}
