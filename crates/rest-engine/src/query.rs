//! URL construction from host, base path, route and query map.

use crate::error::{ErrorCode, RestError};
use crate::options::QueryTransformer;
use serde_json::{json, Map, Value};
use tracing::trace;
use url::Url;

/// Collapse runs of `/` into one.
fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        collapsed.push(c);
    }
    collapsed
}

fn url_error(message: String, data: Option<Value>) -> RestError {
    let mut error = RestError::new(message, None, Some(ErrorCode::UrlParameter));
    error.data = data.map(crate::body::ResponseData::Json);
    error
}

/// Resolve `base_path + "/" + path` against `host`.
pub fn build_url(host: Option<&str>, base_path: Option<&str>, path: &str) -> Result<Url, RestError> {
    let host = host
        .filter(|host| !host.trim().is_empty())
        .ok_or_else(|| url_error("No host configured".to_string(), None))?;
    let base = Url::parse(host)
        .map_err(|e| url_error(format!("Invalid host '{host}': {e}"), None))?;

    let joined = collapse_slashes(&format!("{}/{}", base_path.unwrap_or_default(), path));
    base.join(&joined)
        .map_err(|e| url_error(format!("Invalid path '{joined}': {e}"), None))
}

/// String form of a query value when no transformer is set.
fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(coerce).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

fn remove_param(url: &mut Url, key: &str) {
    if url.query().is_none() {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != key)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Append `query` to `url`.
///
/// Without a transformer every value is appended as-is (arrays joined with
/// `,`). With one, each key is replaced by the transformer's output; keys it
/// drops are omitted unless `include_empty` asks for `key=`.
pub fn apply_query(
    url: &mut Url,
    query: &Map<String, Value>,
    transformer: Option<&QueryTransformer>,
    include_empty: bool,
) -> Result<(), RestError> {
    let Some(transformer) = transformer else {
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, &coerce(value));
        }
        return Ok(());
    };

    for (key, value) in query {
        let transformed = match transformer.call(key, value, query) {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => None,
            other => {
                return Err(url_error(
                    format!("Invalid type for '{key}' parameter: {other}"),
                    Some(json!({"key": key, "value": other})),
                ))
            }
        };
        remove_param(url, key);
        match transformed.filter(|s| !s.is_empty()) {
            Some(s) => {
                url.query_pairs_mut().append_pair(key, &s);
            }
            None if include_empty => {
                url.query_pairs_mut().append_pair(key, "");
            }
            None => trace!("Query parameter '{}' dropped by transformer", key),
        }
    }
    Ok(())
}
