//! Caller-supplied callbacks carried inside [`RestOptions`](super::RestOptions).
//!
//! Each wrapper holds an `Arc`, so cloning options shares the callback
//! instead of copying it.

use crate::client::{Request, Response};
use crate::error::RestError;
use crate::options::ResponseFormat;
use crate::transport::TransportResponse;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

macro_rules! opaque_debug {
    ($($name:ident),* $(,)?) => {
        $(
            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(concat!(stringify!($name), "(..)"))
                }
            }
        )*
    };
}

type TransformFn = dyn Fn(&str, &Value, &Map<String, Value>) -> Value + Send + Sync;

/// Maps `(key, value, whole query)` to the string that ends up in the URL.
///
/// Return a string or number to emit the parameter, `null` or `""` to drop it.
/// Any other JSON type is rejected with `ErrorCode::UrlParameter`.
#[derive(Clone)]
pub struct QueryTransformer(Arc<TransformFn>);

impl QueryTransformer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &Value, &Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, key: &str, value: &Value, query: &Map<String, Value>) -> Value {
        (self.0)(key, value, query)
    }
}

type ResolveFn =
    dyn Fn(&Request, Option<&TransportResponse>) -> BoxFuture<'static, ResponseFormat> + Send + Sync;

/// Declared response format, either fixed or decided per response.
#[derive(Clone)]
pub enum ResponseType {
    Format(ResponseFormat),
    Resolver(Arc<ResolveFn>),
}

impl ResponseType {
    /// Decide the format synchronously from the request and raw response.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Request, Option<&TransportResponse>) -> ResponseFormat + Send + Sync + 'static,
    {
        Self::Resolver(Arc::new(
            move |request: &Request, response: Option<&TransportResponse>| {
                let format = f(request, response);
                async move { format }.boxed()
            },
        ))
    }

    /// Decide the format with an async function. The future must own its data.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(&Request, Option<&TransportResponse>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseFormat> + Send + 'static,
    {
        Self::Resolver(Arc::new(
            move |request: &Request, response: Option<&TransportResponse>| {
                f(request, response).boxed()
            },
        ))
    }

    /// The fixed format, when there is no resolver.
    pub fn format(&self) -> Option<ResponseFormat> {
        match self {
            ResponseType::Format(format) => Some(*format),
            ResponseType::Resolver(_) => None,
        }
    }

    pub(crate) async fn resolve(
        &self,
        request: &Request,
        response: Option<&TransportResponse>,
    ) -> ResponseFormat {
        match self {
            ResponseType::Format(format) => *format,
            ResponseType::Resolver(resolve) => resolve(request, response).await,
        }
    }
}

impl From<ResponseFormat> for ResponseType {
    fn from(format: ResponseFormat) -> Self {
        ResponseType::Format(format)
    }
}

impl fmt::Debug for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseType::Format(format) => write!(f, "Format({format})"),
            ResponseType::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Runs right before the transport call. The async form is awaited first.
#[derive(Clone)]
pub enum OnRequest {
    Sync(Arc<dyn Fn(&Request) + Send + Sync>),
    Async(Arc<dyn Fn(&Request) -> BoxFuture<'static, ()> + Send + Sync>),
}

impl OnRequest {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(&Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Async(Arc::new(move |request: &Request| f(request).boxed()))
    }

    pub(crate) async fn invoke(&self, request: &Request) {
        match self {
            OnRequest::Sync(hook) => hook(request),
            OnRequest::Async(hook) => hook(request).await,
        }
    }
}

impl fmt::Debug for OnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnRequest::Sync(_) => f.write_str("OnRequest::Sync(..)"),
            OnRequest::Async(_) => f.write_str("OnRequest::Async(..)"),
        }
    }
}

/// Called with every completed response that was not consumed by [`OnError`].
#[derive(Clone)]
pub struct OnResponse(Arc<dyn Fn(&Response) + Send + Sync>);

impl OnResponse {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, response: &Response) {
        (self.0)(response)
    }
}

/// Receives errors that would otherwise be raised to the caller.
#[derive(Clone)]
pub struct OnError(Arc<dyn Fn(&RestError, &Response) + Send + Sync>);

impl OnError {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RestError, &Response) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, error: &RestError, response: &Response) {
        (self.0)(error, response)
    }
}

opaque_debug!(QueryTransformer, OnResponse, OnError);
