//! Configurable HTTP request engine.
//!
//! A [`RestClient`] sends requests through a pluggable [`Transport`] using
//! layered [`RestOptions`]: a client-wide [`OptionsStore`] plus per-call
//! overrides combined by merge or assign. On top of that it provides:
//!
//! - URL building from host, base path and query map, with an optional
//!   per-parameter transformer
//! - an in-memory response cache keyed by request fingerprint, with TTLs
//! - timeout and abort handling raced against the transport
//! - error classification with an opt-in throw policy that ordered
//!   `throw_excluding` filters can suppress
//! - `on_request`, `on_response` and `on_error` hooks, and `repeat()`
//!
//! ```no_run
//! use rest_engine::{ResponseFormat, RestClient, RestOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::with_reqwest(
//!     RestOptions::new()
//!         .host("https://api.example.com")
//!         .response_type(ResponseFormat::Json),
//! )?;
//! let response = client.get("/users", RestOptions::new().query_param("page", 2)).await?;
//! if let Some(error) = &response.error {
//!     eprintln!("request failed: {error}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod options;
pub mod query;
pub mod transport;

pub use body::{Blob, Body, FormData, FormValue, ResponseData};
pub use client::{RepeatArgs, Request, Response, RestClient};
pub use config::ClientConfig;
pub use error::{ErrorCode, RestError};
pub use filter::{FilterPattern, ThrowFilter};
pub use options::{
    CacheMode, Credentials, OnError, OnRequest, OnResponse, OptionKey, OptionValue,
    OptionsStore, OverrideStrategy, QueryTransformer, Redirect, ReferrerPolicy, RequestMode,
    ResponseFormat, ResponseType, RestOptions,
};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{AbortController, Transport, TransportError, TransportRequest, TransportResponse};
