use super::{lifecycle, ClientInner};
use crate::body::{Body, ResponseData};
use crate::error::RestError;
use crate::filter::ThrowFilter;
use crate::options::{ResponseFormat, RestOptions};
use crate::transport::TransportResponse;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Weak;
use url::Url;

/// A request as it was sent, with the options it was resolved from.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub body: Option<Body>,
    pub options: RestOptions,
}

/// Outcome of one request attempt.
///
/// On failure `error` is set and `data` is `None`; the parsed error body
/// moves to `error.data`. An aborted request has neither.
#[derive(Clone)]
pub struct Response {
    pub fetch_response: Option<TransportResponse>,
    pub request: Request,
    pub data: Option<ResponseData>,
    /// Format the body was parsed as. `None` when nothing was parsed.
    pub resolved_format: ResponseFormat,
    pub status: Option<StatusCode>,
    pub headers: Option<HeaderMap>,
    pub error: Option<RestError>,
    /// The filter that kept `error` from being raised.
    pub throw_filter: Option<ThrowFilter>,
    pub(crate) path: String,
    pub(crate) client: Weak<ClientInner>,
}

impl Response {
    #[cfg(test)]
    pub(crate) fn detached(request: Request) -> Self {
        Self {
            fetch_response: None,
            path: request.url.path().to_string(),
            request,
            data: None,
            resolved_format: ResponseFormat::None,
            status: None,
            headers: None,
            error: None,
            throw_filter: None,
            client: Weak::new(),
        }
    }

    /// `true` when no error was recorded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Deserialize JSON `data` into `T`. `None` when there is no JSON data.
    pub fn json<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.data
            .as_ref()
            .and_then(ResponseData::as_json)
            .map(|value| serde_json::from_value(value.clone()))
    }

    pub fn text(&self) -> Option<&str> {
        self.data.as_ref().and_then(ResponseData::as_text)
    }

    /// Send the same request again through the full lifecycle.
    ///
    /// Overrides are resolved against the options this attempt used, with
    /// the override strategy in effect for it.
    pub async fn repeat(&self, args: impl Into<RepeatArgs>) -> Result<Response, RestError> {
        let RepeatArgs { method, overrides } = args.into();
        let Some(inner) = self.client.upgrade() else {
            return Err(RestError::new(
                "Cannot repeat request: its client has been dropped",
                None,
                None,
            ));
        };
        let method = method.unwrap_or_else(|| self.request.method.clone());
        lifecycle::execute(
            &inner,
            method,
            &self.path,
            Some(&self.request.options),
            overrides,
        )
        .await
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("request", &self.request)
            .field("status", &self.status)
            .field("data", &self.data)
            .field("resolved_format", &self.resolved_format)
            .field("error", &self.error)
            .field("throw_filter", &self.throw_filter)
            .finish_non_exhaustive()
    }
}

/// Arguments of [`Response::repeat`]: an optional new method and optional overrides.
#[derive(Debug, Clone, Default)]
pub struct RepeatArgs {
    pub method: Option<Method>,
    pub overrides: Option<RestOptions>,
}

impl From<()> for RepeatArgs {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<RestOptions> for RepeatArgs {
    fn from(overrides: RestOptions) -> Self {
        Self {
            method: None,
            overrides: Some(overrides),
        }
    }
}

impl From<Method> for RepeatArgs {
    fn from(method: Method) -> Self {
        Self {
            method: Some(method),
            overrides: None,
        }
    }
}

impl From<(Method, RestOptions)> for RepeatArgs {
    fn from((method, overrides): (Method, RestOptions)) -> Self {
        Self {
            method: Some(method),
            overrides: Some(overrides),
        }
    }
}

impl From<(Option<Method>, RestOptions)> for RepeatArgs {
    fn from((method, overrides): (Option<Method>, RestOptions)) -> Self {
        Self {
            method,
            overrides: Some(overrides),
        }
    }
}
