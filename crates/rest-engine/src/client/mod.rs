//! The request engine.
//!
//! A [`RestClient`] owns an options layer, a response cache and a transport.
//! Each call resolves its options against the layer, builds the URL, consults
//! the cache, fires hooks, races the transport against the timeout,
//! classifies the outcome and applies the throw policy. See
//! [`RestClient::request`].

mod lifecycle;
mod response;

pub use response::{RepeatArgs, Request, Response};

use crate::cache::{cache_key, expiry_deadline, ResponseCache};
use crate::error::RestError;
use crate::options::{OptionKey, OptionValue, OptionsStore, RestOptions};
use crate::transport::Transport;
use http::Method;
use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;

pub(crate) struct ClientInner {
    pub(crate) options: RwLock<OptionsStore>,
    pub(crate) cache: ResponseCache,
    pub(crate) transport: Arc<dyn Transport>,
}

/// Handle to a request engine. Clones share options, cache and transport.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

impl RestClient {
    pub fn new(options: RestOptions, transport: Arc<dyn Transport>) -> Self {
        Self::from_store(OptionsStore::new(options), transport)
    }

    pub fn from_store(store: OptionsStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options: RwLock::new(store),
                cache: ResponseCache::new(),
                transport,
            }),
        }
    }

    /// Client over a default [`ReqwestTransport`](crate::transport::ReqwestTransport).
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest(
        options: RestOptions,
    ) -> Result<Self, crate::transport::TransportError> {
        let transport = crate::transport::ReqwestTransport::new()?;
        Ok(Self::new(options, Arc::new(transport)))
    }

    /// Send a request.
    ///
    /// Failures are reported on [`Response::error`]. `Err` is returned only
    /// when the URL cannot be built, or when `throw` is on, no
    /// `throw_excluding` filter matches and no `on_error` hook is set.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        overrides: impl Into<Option<RestOptions>>,
    ) -> Result<Response, RestError> {
        lifecycle::execute(&self.inner, method, path, None, overrides.into()).await
    }

    pub async fn get(
        &self,
        path: &str,
        overrides: impl Into<Option<RestOptions>>,
    ) -> Result<Response, RestError> {
        self.request(Method::GET, path, overrides).await
    }

    pub async fn post(
        &self,
        path: &str,
        overrides: impl Into<Option<RestOptions>>,
    ) -> Result<Response, RestError> {
        self.request(Method::POST, path, overrides).await
    }

    pub async fn put(
        &self,
        path: &str,
        overrides: impl Into<Option<RestOptions>>,
    ) -> Result<Response, RestError> {
        self.request(Method::PUT, path, overrides).await
    }

    pub async fn patch(
        &self,
        path: &str,
        overrides: impl Into<Option<RestOptions>>,
    ) -> Result<Response, RestError> {
        self.request(Method::PATCH, path, overrides).await
    }

    pub async fn delete(
        &self,
        path: &str,
        overrides: impl Into<Option<RestOptions>>,
    ) -> Result<Response, RestError> {
        self.request(Method::DELETE, path, overrides).await
    }

    /// Cache key this client would use for `url` and `method` with its
    /// current options. `custom_key` replaces the configured prefix when it
    /// is not blank.
    pub fn cache_key(&self, url: &Url, method: &Method, custom_key: Option<&str>) -> String {
        let store = self.inner.options.read();
        let options = store.as_options();
        let prefix = custom_key
            .filter(|key| !key.trim().is_empty())
            .or(options.cache_key.as_deref())
            .unwrap_or_default();
        cache_key(
            prefix.trim(),
            url,
            method,
            options.body.as_ref(),
            options.response_format(),
        )
    }

    /// Cached response for `url` and `method`, if present and not expired.
    pub fn cache_get(&self, url: &Url, method: &Method, custom_key: Option<&str>) -> Option<Response> {
        self.inner.cache.get(&self.cache_key(url, method, custom_key))
    }

    /// Store `response` under the key of its request, overwriting any entry.
    ///
    /// Expiry follows the cache settings the response was requested with.
    pub fn cache_set(&self, response: &Response, custom_key: Option<&str>) {
        let request = &response.request;
        let key = self.cache_key(&request.url, &request.method, custom_key);
        let deadline = expiry_deadline(
            request.options.cache_expire_in,
            request.options.cache_expire_at,
        );
        self.inner.cache.set(key, response.clone(), deadline);
    }

    pub fn cache_clear(&self) {
        self.inner.cache.clear();
    }

    /// Drop cached responses stored under `key`. A blank key does nothing.
    pub fn cache_clear_by_key(&self, key: &str) {
        self.inner.cache.clear_by_key(key.trim());
    }

    pub fn cache_purge_expired(&self) -> usize {
        self.inner.cache.purge_expired()
    }

    /// Stored entries, expired ones included.
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn get_option(&self, key: OptionKey) -> Option<OptionValue> {
        self.inner.options.read().get(key)
    }

    pub fn set_option(&self, value: OptionValue) -> &Self {
        self.inner.options.write().set(value);
        self
    }

    pub fn unset_option(&self, key: OptionKey) -> &Self {
        self.inner.options.write().unset(key);
        self
    }

    pub fn merge_options(&self, options: RestOptions) -> &Self {
        self.inner.options.write().merge(options);
        self
    }

    pub fn assign_options(&self, options: RestOptions) -> &Self {
        self.inner.options.write().assign(options);
        self
    }

    /// Options a call would run with: `overrides` resolved against `base`,
    /// or against this client's layer when `base` is `None`.
    pub fn options_override(
        &self,
        overrides: impl Into<Option<RestOptions>>,
        base: Option<&RestOptions>,
    ) -> RestOptions {
        match base {
            Some(base) => OptionsStore::resolve(base, overrides.into()),
            None => OptionsStore::resolve(self.inner.options.read().as_options(), overrides.into()),
        }
    }

    /// Independent copy of this client's options layer.
    pub fn clone_options(&self) -> OptionsStore {
        self.inner.options.read().clone()
    }

    /// Deep clone of the current options.
    pub fn options(&self) -> RestOptions {
        self.inner.options.read().current()
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("options", &*self.inner.options.read())
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}
