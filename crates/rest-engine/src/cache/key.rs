use crate::body::Body;
use crate::options::ResponseFormat;
use http::Method;
use url::Url;

/// Fingerprint of a request: `{prefix}|{url}|{method}|{body projection}`.
///
/// The body only contributes when the declared response format is JSON,
/// text or form data, see [`Body::fingerprint`]. A dynamic response type
/// counts as undeclared.
pub fn cache_key(
    prefix: &str,
    url: &Url,
    method: &Method,
    body: Option<&Body>,
    format: Option<ResponseFormat>,
) -> String {
    let inputs = body
        .map(|body| body.fingerprint(format))
        .unwrap_or_default();
    format!("{prefix}|{url}|{method}|{inputs}")
}
