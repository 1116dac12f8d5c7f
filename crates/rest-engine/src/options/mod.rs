//! Request options and the layered options store.
//!
//! [`RestOptions`] is the single bag of settings shared by the global layer
//! (the [`OptionsStore`]) and per-call overrides. Every field is optional;
//! an unset field means "inherit" during a merge and "use the default" when
//! the engine reads it.

mod fields;
mod hooks;
mod merge;
mod store;

pub use fields::{
    CacheMode, Credentials, OverrideStrategy, Redirect, ReferrerPolicy, RequestMode,
    ResponseFormat,
};
pub use hooks::{OnError, OnRequest, OnResponse, QueryTransformer, ResponseType};
pub use merge::{merge_json_map, DeepClone, Merge};
pub use store::{OptionsStore, DEFAULT_TIMEOUT};

use crate::body::Body;
use crate::filter::ThrowFilter;
use crate::transport::AbortController;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Declares every option once and derives the struct, the key/value enums,
/// the builder setters and the clone/merge/assign plumbing from that list.
macro_rules! rest_options {
    ($( $(#[$doc:meta])* $field:ident / $variant:ident : $ty:ty ),* $(,)?) => {
        /// Settings for a request. See the module docs for layering rules.
        #[derive(Clone, Default)]
        pub struct RestOptions {
            $( $(#[$doc])* pub $field: Option<$ty>, )*
        }

        /// Names one field of [`RestOptions`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OptionKey {
            $( $variant, )*
        }

        /// A typed value for one field of [`RestOptions`].
        #[derive(Debug, Clone)]
        pub enum OptionValue {
            $( $variant($ty), )*
        }

        impl OptionKey {
            pub const ALL: &'static [OptionKey] = &[$( OptionKey::$variant, )*];

            pub fn name(&self) -> &'static str {
                match self {
                    $( OptionKey::$variant => stringify!($field), )*
                }
            }
        }

        impl OptionValue {
            pub fn key(&self) -> OptionKey {
                match self {
                    $( OptionValue::$variant(_) => OptionKey::$variant, )*
                }
            }
        }

        impl RestOptions {
            $(
                #[doc = concat!("Sets `", stringify!($field), "`.")]
                #[must_use]
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.$field = Some(value.into());
                    self
                }
            )*

            /// Read one field. The returned value is a deep clone.
            pub fn get(&self, key: OptionKey) -> Option<OptionValue> {
                match key {
                    $( OptionKey::$variant => self.$field.as_ref().map(|v| OptionValue::$variant(v.deep_clone())), )*
                }
            }

            pub fn set(&mut self, value: OptionValue) {
                match value {
                    $( OptionValue::$variant(v) => self.$field = Some(v), )*
                }
            }

            pub fn unset(&mut self, key: OptionKey) {
                match key {
                    $( OptionKey::$variant => self.$field = None, )*
                }
            }

            pub fn is_set(&self, key: OptionKey) -> bool {
                match key {
                    $( OptionKey::$variant => self.$field.is_some(), )*
                }
            }

            /// Shallow combination: every field set in `source` replaces ours.
            pub fn assign(&mut self, source: RestOptions) {
                $(
                    if source.$field.is_some() {
                        self.$field = source.$field;
                    }
                )*
            }

            /// Recursive combination, see [`Merge`].
            pub fn merge(&mut self, source: RestOptions) {
                $( merge::merge_option(&mut self.$field, source.$field); )*
            }
        }

        impl DeepClone for RestOptions {
            fn deep_clone(&self) -> Self {
                RestOptions {
                    $( $field: self.$field.as_ref().map(DeepClone::deep_clone), )*
                }
            }
        }

        impl fmt::Debug for RestOptions {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut debug = f.debug_struct("RestOptions");
                $(
                    if let Some(value) = &self.$field {
                        debug.field(stringify!($field), value);
                    }
                )*
                debug.finish()
            }
        }
    };
}

rest_options! {
    /// Absolute origin the path is resolved against, e.g. `https://api.example.com`.
    host / Host: String,
    /// Prefix joined in front of every path.
    base_path / BasePath: String,
    /// Query parameters. Arrays are joined with `,` unless a transformer is set.
    query / Query: Map<String, Value>,
    query_params_transformer / QueryParamsTransformer: QueryTransformer,
    /// Emit `key=` for parameters the transformer drops.
    query_params_include_empty / QueryParamsIncludeEmpty: bool,
    headers / Headers: HeaderMap,
    body / Body: Body,
    response_type / ResponseType: ResponseType,
    /// Zero disables the timer.
    timeout / Timeout: Duration,
    abort_controller / AbortController: AbortController,
    override_strategy / OverrideStrategy: OverrideStrategy,
    credentials / Credentials: Credentials,
    mode / Mode: RequestMode,
    cache / Cache: CacheMode,
    redirect / Redirect: Redirect,
    referrer / Referrer: String,
    referrer_policy / ReferrerPolicy: ReferrerPolicy,
    keepalive / Keepalive: bool,
    /// Store completed responses in the in-memory cache.
    cache_in_memory / CacheInMemory: bool,
    /// Prefix of the cache fingerprint; must not contain `|`.
    cache_key / CacheKey: String,
    cache_expire_in / CacheExpireIn: Duration,
    cache_expire_at / CacheExpireAt: DateTime<Utc>,
    /// Raise classified errors to the caller.
    throw / Throw: bool,
    /// Filters that suppress raising, evaluated in order.
    throw_excluding / ThrowExcluding: Vec<ThrowFilter>,
    on_request / OnRequest: OnRequest,
    on_response / OnResponse: OnResponse,
    on_error / OnError: OnError,
}

impl RestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add one header, replacing any value already set under `name`.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// Append one filter to `throw_excluding`.
    #[must_use]
    pub fn throw_excluding_filter(mut self, filter: impl Into<ThrowFilter>) -> Self {
        self.throw_excluding
            .get_or_insert_with(Vec::new)
            .push(filter.into());
        self
    }

    /// Effective `throw`: the explicit setting, or on when any
    /// `throw_excluding` filter is configured.
    pub fn throws(&self) -> bool {
        self.throw.unwrap_or_else(|| {
            self.throw_excluding
                .as_ref()
                .is_some_and(|filters| !filters.is_empty())
        })
    }

    pub(crate) fn response_format(&self) -> Option<ResponseFormat> {
        self.response_type.as_ref().and_then(ResponseType::format)
    }
}
