//! Enumerated option values.
//!
//! Every enum serializes the way it is written in configuration files
//! (`same-origin`, `no-store`, `arrayBuffer`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// How per-call overrides combine with the stored options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideStrategy {
    /// Recursive combination; see [`Merge`](crate::options::Merge).
    #[default]
    Merge,
    /// Shallow replacement of every field the override sets.
    Assign,
}

/// Declared body format of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseFormat {
    /// Do not read the body.
    #[default]
    None,
    Json,
    Text,
    Blob,
    ArrayBuffer,
    FormData,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::None => "none",
            ResponseFormat::Json => "json",
            ResponseFormat::Text => "text",
            ResponseFormat::Blob => "blob",
            ResponseFormat::ArrayBuffer => "arrayBuffer",
            ResponseFormat::FormData => "formData",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ResponseFormat::None)
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Cors,
    NoCors,
    #[default]
    SameOrigin,
    Navigate,
}

/// Transport-level cache directive. Unrelated to the in-memory response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

impl CacheMode {
    /// `Cache-Control` value a transport should send for this mode, if any.
    pub fn cache_control(&self) -> Option<&'static str> {
        match self {
            CacheMode::NoStore => Some("no-store"),
            CacheMode::Reload | CacheMode::NoCache => Some("no-cache"),
            CacheMode::ForceCache | CacheMode::OnlyIfCached => Some("max-stale"),
            CacheMode::Default => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Redirect {
    #[default]
    Follow,
    Error,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferrerPolicy {
    NoReferrer,
    #[default]
    NoReferrerWhenDowngrade,
    Origin,
    OriginWhenCrossOrigin,
    SameOrigin,
    StrictOrigin,
    StrictOriginWhenCrossOrigin,
    UnsafeUrl,
}
