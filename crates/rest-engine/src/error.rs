//! The error carried by failed requests.

use crate::body::ResponseData;
use crate::client::Request;
use crate::transport::{TransportError, TransportResponse};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Internal classification of a failure. HTTP and transport failures have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Timeout,
    BodyParse,
    UrlParameter,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "Timeout",
            ErrorCode::BodyParse => "BodyParse",
            ErrorCode::UrlParameter => "UrlParameter",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request.
///
/// Built by the engine with a message, an optional status and an optional
/// [`ErrorCode`]. The request, the raw response and the parsed error body are
/// attached afterwards, once they are known.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RestError {
    pub message: String,
    pub code: Option<ErrorCode>,
    pub status_code: Option<StatusCode>,
    pub request: Option<Request>,
    pub fetch_response: Option<TransportResponse>,
    /// Parsed body of the failed response, when it could be read.
    pub data: Option<ResponseData>,
    #[source]
    source: Option<Arc<TransportError>>,
}

impl RestError {
    pub fn new(
        message: impl Into<String>,
        status_code: Option<StatusCode>,
        code: Option<ErrorCode>,
    ) -> Self {
        Self {
            message: message.into(),
            code,
            status_code,
            request: None,
            fetch_response: None,
            data: None,
            source: None,
        }
    }

    pub(crate) fn from_transport(error: TransportError) -> Self {
        let mut rest = Self::new(error.to_string(), None, None);
        rest.source = Some(Arc::new(error));
        rest
    }

    /// The transport failure behind this error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        self.source.as_deref()
    }

    pub fn is_timeout(&self) -> bool {
        self.code == Some(ErrorCode::Timeout)
    }

    pub fn is_body_parse(&self) -> bool {
        self.code == Some(ErrorCode::BodyParse)
    }

    pub fn is_url_parameter(&self) -> bool {
        self.code == Some(ErrorCode::UrlParameter)
    }
}
