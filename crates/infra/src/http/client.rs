use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody, TransportError};
use beacon_domain::{BeaconError, HttpConfig, PlatformConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use tracing::{debug, warn};

use crate::errors::IntoTransportError;

/// [`HttpTransport`] backed by a shared reqwest client.
///
/// Each call performs exactly one exchange. Retrying after a 401 is the
/// dispatcher's job, and nothing else is retried.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Transport configured from the `http` and `platform` sections.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` if the client cannot be built.
    pub fn from_config(http: &HttpConfig, platform: &PlatformConfig) -> Result<Self, BeaconError> {
        let mut builder = Self::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .accept_invalid_certs(platform.accepts_invalid_certs());

        if let Some(agent) = &http.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        if platform.accepts_invalid_certs() {
            warn!(environment = %platform.environment, "TLS certificate validation is disabled");
        }

        builder.build()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = to_method(request.method);
        debug!(%method, path = request.path(), "sending HTTP request");

        let mut builder = self.client.request(method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = builder.send().await.map_err(|err| {
            debug!(%method, error = %err, "HTTP request failed");
            err.into_transport(self.timeout)
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|err| err.into_transport(self.timeout))?;
        debug!(%method, status, bytes = body.len(), "received HTTP response");

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
    accept_invalid_certs: bool,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            default_headers: None,
            accept_invalid_certs: false,
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Add one header sent with every request.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` if the name or value is not a valid
    /// header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, BeaconError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| BeaconError::Config(format!("Invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| BeaconError::Config(format!("Invalid value for header {name}: {e}")))?;
        self.default_headers.get_or_insert_with(HeaderMap::new).insert(name, value);
        Ok(self)
    }

    /// Skip TLS certificate validation. Only honoured for policies that
    /// allow it; see `CertificateTrustPolicy`.
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// Returns `BeaconError::Config` if reqwest rejects the settings.
    pub fn build(self) -> Result<ReqwestTransport, BeaconError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| BeaconError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(ReqwestTransport { client, timeout: self.timeout })
    }
}
