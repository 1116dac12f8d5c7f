//! Combination and cloning rules for option values.
//!
//! `Merge` is the per-type half of the merge override strategy: an absent
//! source never clears the target, maps are combined key-wise, lists are
//! concatenated and everything else is replaced. `DeepClone` produces
//! independent copies; abort handles are the one value that is never shared.

use crate::body::Body;
use crate::filter::ThrowFilter;
use crate::options::fields::{
    CacheMode, Credentials, OverrideStrategy, Redirect, ReferrerPolicy, RequestMode,
};
use crate::options::hooks::{OnError, OnRequest, OnResponse, QueryTransformer, ResponseType};
use crate::transport::AbortController;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::trace;

/// Combine `source` into `self`, consuming the source.
pub trait Merge {
    fn merge(&mut self, source: Self);
}

/// Copy that shares no mutable state with the original.
pub trait DeepClone {
    fn deep_clone(&self) -> Self;
}

/// Merge an optional value: `None` keeps whatever the target holds.
pub(crate) fn merge_option<T: Merge>(target: &mut Option<T>, source: Option<T>) {
    let Some(source) = source else {
        return;
    };
    match target {
        Some(current) => current.merge(source),
        None => *target = Some(source),
    }
}

macro_rules! replace_on_merge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Merge for $ty {
                fn merge(&mut self, source: Self) {
                    *self = source;
                }
            }

            impl DeepClone for $ty {
                fn deep_clone(&self) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

replace_on_merge!(
    String,
    bool,
    Duration,
    DateTime<Utc>,
    Body,
    ResponseType,
    QueryTransformer,
    OnRequest,
    OnResponse,
    OnError,
    OverrideStrategy,
    Credentials,
    RequestMode,
    CacheMode,
    Redirect,
    ReferrerPolicy,
);

impl Merge for AbortController {
    fn merge(&mut self, source: Self) {
        *self = source;
    }
}

impl DeepClone for AbortController {
    fn deep_clone(&self) -> Self {
        AbortController::new()
    }
}

impl Merge for Vec<ThrowFilter> {
    fn merge(&mut self, source: Self) {
        self.extend(source);
    }
}

impl DeepClone for Vec<ThrowFilter> {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

/// Header merge: source headers overwrite by name; an empty, `null` or
/// `undefined` value removes the header instead.
impl Merge for HeaderMap {
    fn merge(&mut self, source: Self) {
        for name in source.keys() {
            let values: Vec<HeaderValue> = source.get_all(name).iter().cloned().collect();
            self.remove(name);
            if values.iter().any(is_header_tombstone) {
                trace!("Header '{}' removed by merge", name);
                continue;
            }
            for value in values {
                self.append(name.clone(), value);
            }
        }
    }
}

impl DeepClone for HeaderMap {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

fn is_header_tombstone(value: &HeaderValue) -> bool {
    matches!(value.as_bytes(), b"" | b"null" | b"undefined")
}

impl Merge for Map<String, Value> {
    fn merge(&mut self, source: Self) {
        merge_json_map(self, source);
    }
}

impl DeepClone for Map<String, Value> {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

/// Recursive JSON object merge used for the query map.
///
/// A `null` source value keeps an existing entry, arrays concatenate,
/// nested objects recurse and any other value replaces.
pub fn merge_json_map(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => merge_json_value(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_json_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (_, Value::Null) => {}
        (Value::Array(existing), Value::Array(incoming)) => existing.extend(incoming),
        (Value::Object(existing), Value::Object(incoming)) => merge_json_map(existing, incoming),
        (existing, incoming) => *existing = incoming,
    }
}
