//! File-based client configuration.
//!
//! ```yaml
//! host: "https://api.example.com"
//! base_path: "/v1"
//! timeout_ms: 5000
//! response_type: json
//! headers:
//!   authorization: "Bearer token"
//! cache_in_memory: true
//! cache_key: "api"
//! cache_expire_in_ms: 60000
//! throw: true
//! throw_excluding:
//!   - status_code: 404
//!   - path: "/health"
//!     method: get
//! ```

use crate::error::ErrorCode;
use crate::filter::{FilterPattern, ThrowFilter};
use crate::options::{
    CacheMode, Credentials, OverrideStrategy, Redirect, ReferrerPolicy, RequestMode,
    ResponseFormat, RestOptions,
};
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A configuration value that parses as YAML/JSON but not as an HTTP type.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    #[error("invalid status code {0} in throw_excluding")]
    InvalidStatusCode(u16),
}

/// One literal entry of `throw_excluding`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error_code: Option<ErrorCode>,
}

impl FilterConfig {
    fn into_pattern(self) -> Result<FilterPattern, ConfigError> {
        let status_code = self
            .status_code
            .map(|code| {
                StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatusCode(code))
            })
            .transpose()?;
        Ok(FilterPattern {
            path: self.path,
            method: self.method,
            status_code,
            error_code: self.error_code,
            on_filter_match: None,
        })
    }
}

/// Serializable subset of [`RestOptions`]; callbacks have no file form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: Option<String>,
    pub base_path: Option<String>,
    pub query: Option<Map<String, Value>>,
    pub query_params_include_empty: Option<bool>,
    pub headers: BTreeMap<String, String>,
    pub response_type: Option<ResponseFormat>,
    pub timeout_ms: Option<u64>,
    pub override_strategy: Option<OverrideStrategy>,
    pub credentials: Option<Credentials>,
    pub mode: Option<RequestMode>,
    pub cache: Option<CacheMode>,
    pub redirect: Option<Redirect>,
    pub referrer: Option<String>,
    pub referrer_policy: Option<ReferrerPolicy>,
    pub keepalive: Option<bool>,
    pub cache_in_memory: Option<bool>,
    pub cache_key: Option<String>,
    pub cache_expire_in_ms: Option<u64>,
    pub cache_expire_at: Option<DateTime<Utc>>,
    pub throw: Option<bool>,
    pub throw_excluding: Vec<FilterConfig>,
}

impl ClientConfig {
    /// Load and validate a configuration file. `.json` files are read as
    /// JSON, everything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: ClientConfig = if is_json {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(host) = &self.host {
            let url = Url::parse(host)
                .map_err(|e| anyhow::anyhow!("Invalid host '{}': {}", host, e))?;
            if url.cannot_be_a_base() {
                anyhow::bail!("Host '{}' must be an absolute URL", host);
            }
        }

        if let Some(base_path) = &self.base_path {
            if !base_path.is_empty() && !base_path.starts_with('/') {
                anyhow::bail!("base_path '{}' must start with '/'", base_path);
            }
        }

        if let Some(cache_key) = &self.cache_key {
            if cache_key.contains('|') {
                anyhow::bail!("cache_key '{}' must not contain '|'", cache_key);
            }
        }

        if self.cache_expire_in_ms.is_some() && self.cache_in_memory != Some(true) {
            tracing::warn!("cache_expire_in_ms is set but cache_in_memory is not enabled");
        }

        Ok(())
    }

    /// Convert to an options layer.
    pub fn into_options(self) -> Result<RestOptions, ConfigError> {
        let headers = if self.headers.is_empty() {
            None
        } else {
            let mut headers = HeaderMap::new();
            for (name, value) in self.headers {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ConfigError::InvalidHeaderName(name.clone()))?;
                let header_value = HeaderValue::from_str(&value)
                    .map_err(|_| ConfigError::InvalidHeaderValue(name.clone()))?;
                headers.append(header_name, header_value);
            }
            Some(headers)
        };

        let throw_excluding = if self.throw_excluding.is_empty() {
            None
        } else {
            let filters = self
                .throw_excluding
                .into_iter()
                .map(|filter| filter.into_pattern().map(Into::into))
                .collect::<Result<Vec<ThrowFilter>, _>>()?;
            Some(filters)
        };

        Ok(RestOptions {
            host: self.host,
            base_path: self.base_path,
            query: self.query,
            query_params_include_empty: self.query_params_include_empty,
            headers,
            response_type: self.response_type.map(Into::into),
            timeout: self.timeout_ms.map(Duration::from_millis),
            override_strategy: self.override_strategy,
            credentials: self.credentials,
            mode: self.mode,
            cache: self.cache,
            redirect: self.redirect,
            referrer: self.referrer,
            referrer_policy: self.referrer_policy,
            keepalive: self.keepalive,
            cache_in_memory: self.cache_in_memory,
            cache_key: self.cache_key,
            cache_expire_in: self.cache_expire_in_ms.map(Duration::from_millis),
            cache_expire_at: self.cache_expire_at,
            throw: self.throw,
            throw_excluding,
            ..RestOptions::default()
        })
    }
}
