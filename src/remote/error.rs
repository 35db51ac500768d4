//! Transport error types
//!
//! Every failure talking to an upstream (network, timeout, non-2xx status,
//! undecodable body) collapses into [`TransportError`].

use thiserror::Error;

/// Errors that can occur when calling an upstream API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request did not complete within the upstream's timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Could not connect to the upstream
    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// Upstream answered with a non-2xx status
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body was not valid JSON
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// URL could not be built from the base and path
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Header value rejected while building the client
    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    /// Any other request failure
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl TransportError {
    /// Classify a reqwest failure for the given URL
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            TransportError::Timeout { url }
        } else if err.is_connect() {
            TransportError::Connect {
                url,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                url,
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                url,
                message: err.to_string(),
            }
        }
    }

    /// HTTP status, if the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
