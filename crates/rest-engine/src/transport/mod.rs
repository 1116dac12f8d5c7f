//! Transport boundary.
//!
//! The engine never talks to the network itself. It hands a
//! [`TransportRequest`] to a [`Transport`] and gets back a fully buffered
//! [`TransportResponse`]. Transports are expected to observe the request's
//! [`AbortSignal`] and fail with [`TransportError::Aborted`] when it fires.

mod abort;
#[cfg(feature = "reqwest")]
mod reqwest_transport;

pub use abort::{AbortController, AbortSignal};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;

use crate::body::{self, BodyParseError, FormData};
use crate::options::{CacheMode, Credentials, Redirect, ReferrerPolicy, RequestMode};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Failures reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("The operation was aborted")]
    Aborted,

    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        TransportError::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TransportError::Network {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }
}

/// What the engine asks a transport to send.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    /// Encoded body. Always `None` for GET and HEAD.
    pub body: Option<Bytes>,
    pub credentials: Credentials,
    pub mode: RequestMode,
    pub cache: CacheMode,
    pub redirect: Redirect,
    pub referrer: Option<String>,
    pub referrer_policy: ReferrerPolicy,
    pub keepalive: bool,
    pub signal: AbortSignal,
}

/// A completed exchange with the body already buffered.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub url: Url,
    pub status: StatusCode,
    /// Reason phrase as sent by the server, or the canonical one.
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(url: Url, status: StatusCode) -> Self {
        Self {
            url,
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body and a matching `Content-Length`.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers
            .insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        self
    }

    /// Set a JSON body with its content type.
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(value.to_string())
    }

    /// `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Whether there is nothing to parse: 204, `Content-Length: 0` or no bytes.
    pub fn is_empty_body(&self) -> bool {
        if self.status == StatusCode::NO_CONTENT || self.body.is_empty() {
            return true;
        }
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            == Some(0)
    }

    pub fn json(&self) -> Result<Value, BodyParseError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn blob(&self) -> body::Blob {
        body::Blob::new(self.body.clone(), self.content_type().map(str::to_string))
    }

    pub fn array_buffer(&self) -> Bytes {
        self.body.clone()
    }

    /// Decode a `multipart/form-data` or `application/x-www-form-urlencoded` body.
    pub fn form_data(&self) -> Result<FormData, BodyParseError> {
        body::parse_form_data(self.content_type(), &self.body)
    }
}

/// Sends requests on behalf of the engine.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
