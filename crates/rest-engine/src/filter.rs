//! Throw-excluding filters.
//!
//! A filter decides whether a classified error should be kept on the
//! response instead of raised. Filters are evaluated one at a time in list
//! order; the first match wins and later filters are never consulted.

use crate::error::{ErrorCode, RestError};
use futures::future::{BoxFuture, FutureExt};
use http::StatusCode;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

type PredicateFn = dyn Fn(&RestError) -> bool + Send + Sync;
type AsyncPredicateFn = dyn Fn(&RestError) -> BoxFuture<'static, bool> + Send + Sync;

/// Callback fired with the error when a [`FilterPattern`] matches.
#[derive(Clone)]
pub struct OnFilterMatch(Arc<dyn Fn(&RestError) + Send + Sync>);

impl OnFilterMatch {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RestError) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, error: &RestError) {
        (self.0)(error)
    }
}

impl fmt::Debug for OnFilterMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnFilterMatch(..)")
    }
}

/// Literal filter. Unset fields match anything; a set field matches only
/// when the error carries a value to compare against.
#[derive(Debug, Clone, Default)]
pub struct FilterPattern {
    /// Substring of the request URL.
    pub path: Option<String>,
    /// Request method, compared case-insensitively.
    pub method: Option<String>,
    pub status_code: Option<StatusCode>,
    pub error_code: Option<ErrorCode>,
    pub on_filter_match: Option<OnFilterMatch>,
}

impl FilterPattern {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    #[must_use]
    pub fn error_code(mut self, error_code: ErrorCode) -> Self {
        self.error_code = Some(error_code);
        self
    }

    #[must_use]
    pub fn on_filter_match<F>(mut self, f: F) -> Self
    where
        F: Fn(&RestError) + Send + Sync + 'static,
    {
        self.on_filter_match = Some(OnFilterMatch::new(f));
        self
    }

    pub fn matches(&self, error: &RestError) -> bool {
        let request = error.request.as_ref();
        let path = self.path.as_deref().filter(|path| !path.is_empty());
        let method = self.method.as_deref().filter(|method| !method.is_empty());

        if (method.is_some() && request.is_none())
            || (self.status_code.is_some() && error.status_code.is_none())
            || (self.error_code.is_some() && error.code.is_none())
        {
            return false;
        }

        let path_matches =
            path.map_or(true, |path| request.is_some_and(|r| r.url.as_str().contains(path)));
        let method_matches = method.map_or(true, |method| {
            request.is_some_and(|r| r.method.as_str().eq_ignore_ascii_case(method))
        });
        let status_matches = self
            .status_code
            .map_or(true, |status| error.status_code == Some(status));
        let code_matches = self
            .error_code
            .map_or(true, |code| error.code == Some(code));

        path_matches && method_matches && status_matches && code_matches
    }
}

/// One entry of `throw_excluding`.
#[derive(Clone)]
pub enum ThrowFilter {
    Pattern(FilterPattern),
    Predicate(Arc<PredicateFn>),
    AsyncPredicate(Arc<AsyncPredicateFn>),
}

impl ThrowFilter {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RestError) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Predicate resolved asynchronously. The future must own what it uses.
    pub fn async_predicate<F, Fut>(f: F) -> Self
    where
        F: Fn(&RestError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::AsyncPredicate(Arc::new(move |error: &RestError| f(error).boxed()))
    }

    /// Fire the pattern's `on_filter_match` callback, if it has one.
    pub(crate) fn notify_match(&self, error: &RestError) {
        if let ThrowFilter::Pattern(FilterPattern {
            on_filter_match: Some(callback),
            ..
        }) = self
        {
            callback.call(error);
        }
    }
}

impl From<FilterPattern> for ThrowFilter {
    fn from(pattern: FilterPattern) -> Self {
        ThrowFilter::Pattern(pattern)
    }
}

impl fmt::Debug for ThrowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThrowFilter::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            ThrowFilter::Predicate(_) => f.write_str("Predicate(..)"),
            ThrowFilter::AsyncPredicate(_) => f.write_str("AsyncPredicate(..)"),
        }
    }
}

impl RestError {
    /// Whether this error satisfies `filter`. Async predicates are awaited.
    pub async fn matches(&self, filter: &ThrowFilter) -> bool {
        match filter {
            ThrowFilter::Pattern(pattern) => pattern.matches(self),
            ThrowFilter::Predicate(predicate) => predicate(self),
            ThrowFilter::AsyncPredicate(predicate) => predicate(self).await,
        }
    }

    /// First filter, in order, that matches. Each one is fully resolved
    /// before the next is evaluated.
    pub async fn find_first_match(&self, filters: &[ThrowFilter]) -> Option<ThrowFilter> {
        for (index, filter) in filters.iter().enumerate() {
            if self.matches(filter).await {
                trace!("Error '{}' matched throw filter #{}", self.message, index);
                return Some(filter.clone());
            }
        }
        None
    }
}
