//! Manifest descriptor
//!
//! The descriptor is kept as the full response envelope; accessors dig the
//! interesting fields out of `Response` on demand.

use serde_json::Value;
use thiserror::Error;

/// The descriptor response does not have the expected shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataShapeError {
    #[error("Manifest descriptor is missing field '{0}'")]
    MissingField(String),

    #[error("Manifest descriptor has no content path for locale '{0}'")]
    MissingLocale(String),
}

/// Manifest descriptor envelope as returned by Bungie
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDescriptor {
    body: Value,
}

impl ManifestDescriptor {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Full decoded body, `ErrorCode`/`Message` included
    pub fn envelope(&self) -> &Value {
        &self.body
    }

    pub fn into_envelope(self) -> Value {
        self.body
    }

    /// Manifest version string, when the descriptor carries one
    pub fn version(&self) -> Option<&str> {
        self.body
            .get("Response")
            .and_then(|r| r.get("version"))
            .and_then(Value::as_str)
    }

    /// Locale codes with a JSON world content path
    pub fn locales(&self) -> Vec<&str> {
        self.body
            .get("Response")
            .and_then(|r| r.get("jsonWorldContentPaths"))
            .and_then(Value::as_object)
            .map(|paths| paths.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// `Response.jsonWorldContentPaths.<locale>`
    pub fn content_path(&self, locale: &str) -> Result<&str, DataShapeError> {
        let response = self
            .body
            .get("Response")
            .ok_or_else(|| DataShapeError::MissingField("Response".to_string()))?;

        let paths = response
            .get("jsonWorldContentPaths")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                DataShapeError::MissingField("Response.jsonWorldContentPaths".to_string())
            })?;

        paths
            .get(locale)
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| DataShapeError::MissingLocale(locale.to_string()))
    }
}
