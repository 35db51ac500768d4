//! Upstream HTTP client
//!
//! A thin wrapper around one configured `reqwest::Client`: base URL,
//! timeout, default headers and an `Authorization` value injected into
//! every request. Responses are decoded to JSON; failures are logged
//! before they are handed back to the caller.

use crate::remote::error::TransportError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

/// One configured upstream API
#[derive(Debug, Clone)]
pub struct Upstream {
    name: &'static str,
    client: Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
}

/// Builder-style settings for an [`Upstream`]
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Short name used in log fields ("bungie", "backend", ...)
    pub name: &'static str,
    /// Base URL relative paths are joined onto
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Headers sent with every request
    pub headers: Vec<(&'static str, String)>,
    /// Authorization value injected into every request
    pub authorization: Option<String>,
}

impl UpstreamConfig {
    pub fn new(name: &'static str, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name,
            base_url: base_url.into(),
            timeout,
            headers: Vec::new(),
            authorization: None,
        }
    }

    /// Add a default header
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Inject an Authorization header into every request
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}

impl Upstream {
    /// Build the underlying client
    pub fn new(config: UpstreamConfig) -> Result<Self, TransportError> {
        let base_url = normalize_base(&config.base_url)?;

        let mut headers = HeaderMap::new();
        for &(name, ref value) in &config.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::InvalidHeader {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            headers.insert(header_name, header_value(name, value)?);
        }

        let authorization = config
            .authorization
            .as_deref()
            .map(|value| header_value("authorization", value))
            .transpose()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::from_reqwest(base_url.as_str(), e))?;

        Ok(Self {
            name: config.name,
            client,
            base_url,
            authorization,
        })
    }

    /// Upstream name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Base URL with trailing slash
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path against the base URL
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                message: e.to_string(),
            })
    }

    /// GET a path relative to the base URL and decode the JSON body
    pub async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        let url = match self.url_for(path) {
            Ok(url) => url,
            Err(e) => return Err(self.log_failure(e)),
        };
        self.get_url(url, None).await
    }

    /// GET an absolute URL, optionally overriding the client timeout
    pub async fn get_json_url(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                return Err(self.log_failure(TransportError::InvalidUrl {
                    url: url.to_string(),
                    message: e.to_string(),
                }))
            }
        };
        self.get_url(url, timeout).await
    }

    async fn get_url(&self, url: Url, timeout: Option<Duration>) -> Result<Value, TransportError> {
        tracing::debug!(upstream = self.name, url = %url, "GET");
        self.execute(url, timeout)
            .await
            .map_err(|e| self.log_failure(e))
    }

    async fn execute(&self, url: Url, timeout: Option<Duration>) -> Result<Value, TransportError> {
        let url_text = url.to_string();

        let mut request = self.client.get(url);
        if let Some(auth) = &self.authorization {
            request = request.header(AUTHORIZATION, auth.clone());
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url_text, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                url: url_text,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::from_reqwest(&url_text, e))
    }

    /// Every failure passes through here on its way back to the caller
    fn log_failure(&self, err: TransportError) -> TransportError {
        tracing::error!(upstream = self.name, error = %err, "Upstream request failed");
        err
    }
}

fn normalize_base(raw: &str) -> Result<Url, TransportError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };

    Url::parse(&with_slash).map_err(|e| TransportError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })
}
