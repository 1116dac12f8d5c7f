//! Request bodies, parsed response data and their wire encodings.

use crate::options::ResponseFormat;
use crate::transport::TransportResponse;
use bytes::{BufMut, Bytes, BytesMut};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

static DISPOSITION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bname="([^"]*)""#).expect("valid regex"));
static DISPOSITION_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bfilename="([^"]*)""#).expect("valid regex"));
static BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)boundary="?([^";]+)"?"#).expect("valid regex"));

/// A response body could not be decoded in the requested format.
#[derive(Debug, Error)]
pub enum BodyParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form data: {0}")]
    Form(String),
}

/// Raw bytes with an optional media type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    bytes: Bytes,
    content_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File { filename: String, blob: Blob },
}

/// Ordered multipart form entries. Names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into(), FormValue::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, filename: impl Into<String>, blob: Blob) {
        self.entries.push((
            name.into(),
            FormValue::File {
                filename: filename.into(),
                blob,
            },
        ));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name-to-value object; later entries win, files become `{}`.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in &self.entries {
            let value = match value {
                FormValue::Text(text) => Value::String(text.clone()),
                FormValue::File { .. } => Value::Object(Map::new()),
            };
            object.insert(name.clone(), value);
        }
        Value::Object(object)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Serialized as JSON with `application/json`.
    Json(Value),
    Text(String),
    Bytes(Bytes),
    Blob(Blob),
    /// `application/x-www-form-urlencoded` pairs.
    UrlEncoded(Vec<(String, String)>),
    /// `multipart/form-data`.
    FormData(FormData),
}

/// Bytes ready for the transport plus the content type they imply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Body {
    pub fn encode(&self) -> EncodedBody {
        match self {
            Body::Json(value) => EncodedBody {
                bytes: Bytes::from(value.to_string()),
                content_type: Some("application/json".to_string()),
            },
            Body::Text(text) => EncodedBody {
                bytes: Bytes::from(text.clone()),
                content_type: Some("text/plain;charset=UTF-8".to_string()),
            },
            Body::Bytes(bytes) => EncodedBody {
                bytes: bytes.clone(),
                content_type: None,
            },
            Body::Blob(blob) => EncodedBody {
                bytes: blob.bytes.clone(),
                content_type: blob.content_type.clone(),
            },
            Body::UrlEncoded(pairs) => EncodedBody {
                bytes: Bytes::from(
                    url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(pairs)
                        .finish(),
                ),
                content_type: Some("application/x-www-form-urlencoded;charset=UTF-8".to_string()),
            },
            Body::FormData(form) => {
                let boundary = format!("----RestEngineBoundary{}", Uuid::new_v4().simple());
                EncodedBody {
                    bytes: encode_multipart(form, &boundary),
                    content_type: Some(format!("multipart/form-data; boundary={boundary}")),
                }
            }
        }
    }

    /// Stable textual projection used in cache fingerprints.
    ///
    /// For a JSON response type structured bodies are serialized and other
    /// payloads collapse to `{}`; for text the body text is used; for form
    /// data the text fields are projected to an object. Any other format does
    /// not distinguish bodies.
    pub fn fingerprint(&self, format: Option<ResponseFormat>) -> String {
        match format {
            Some(ResponseFormat::Json) => match self {
                Body::Json(value) => value.to_string(),
                Body::Text(text) => Value::String(text.clone()).to_string(),
                _ => "{}".to_string(),
            },
            Some(ResponseFormat::Text) => match self {
                Body::Text(text) => text.clone(),
                Body::Json(value) => value.to_string(),
                Body::UrlEncoded(_) => String::from_utf8_lossy(&self.encode().bytes).into_owned(),
                Body::FormData(form) => form.to_json().to_string(),
                Body::Bytes(_) | Body::Blob(_) => String::new(),
            },
            Some(ResponseFormat::FormData) => match self {
                Body::FormData(form) => form.to_json().to_string(),
                _ => String::new(),
            },
            _ => String::new(),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<Blob> for Body {
    fn from(blob: Blob) -> Self {
        Body::Blob(blob)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::FormData(form)
    }
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Text(String),
    Blob(Blob),
    ArrayBuffer(Bytes),
    FormData(FormData),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::ArrayBuffer(bytes) => Some(bytes),
            ResponseData::Blob(blob) => Some(&blob.bytes),
            _ => None,
        }
    }

    pub fn as_form_data(&self) -> Option<&FormData> {
        match self {
            ResponseData::FormData(form) => Some(form),
            _ => None,
        }
    }
}

/// Read `response` in `format`. `None` format and empty bodies yield no data.
pub(crate) fn parse_response(
    response: &TransportResponse,
    format: ResponseFormat,
) -> Result<Option<ResponseData>, BodyParseError> {
    if format.is_none() || response.is_empty_body() {
        return Ok(None);
    }
    let data = match format {
        ResponseFormat::Json => ResponseData::Json(response.json()?),
        ResponseFormat::Text => ResponseData::Text(response.text()),
        ResponseFormat::Blob => ResponseData::Blob(response.blob()),
        ResponseFormat::ArrayBuffer => ResponseData::ArrayBuffer(response.array_buffer()),
        ResponseFormat::FormData => ResponseData::FormData(response.form_data()?),
        ResponseFormat::None => return Ok(None),
    };
    Ok(Some(data))
}

pub(crate) fn parse_form_data(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<FormData, BodyParseError> {
    let content_type = content_type
        .ok_or_else(|| BodyParseError::Form("missing content type".to_string()))?;
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/x-www-form-urlencoded" => {
            let mut form = FormData::new();
            for (name, value) in url::form_urlencoded::parse(body) {
                form.append(name, value);
            }
            Ok(form)
        }
        "multipart/form-data" => {
            let boundary = BOUNDARY
                .captures(content_type)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| BodyParseError::Form("missing multipart boundary".to_string()))?;
            parse_multipart(body, &boundary)
        }
        other => Err(BodyParseError::Form(format!(
            "unsupported content type '{other}'"
        ))),
    }
}

fn encode_multipart(form: &FormData, boundary: &str) -> Bytes {
    let mut out = BytesMut::new();
    for (name, value) in &form.entries {
        out.put_slice(format!("--{boundary}\r\n").as_bytes());
        match value {
            FormValue::Text(text) => {
                out.put_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                out.put_slice(text.as_bytes());
            }
            FormValue::File { filename, blob } => {
                out.put_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                let content_type = blob
                    .content_type()
                    .unwrap_or("application/octet-stream");
                out.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                out.put_slice(&blob.bytes);
            }
        }
        out.put_slice(b"\r\n");
    }
    out.put_slice(format!("--{boundary}--\r\n").as_bytes());
    out.freeze()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}

fn parse_multipart(body: &[u8], boundary: &str) -> Result<FormData, BodyParseError> {
    let malformed = |what: &str| BodyParseError::Form(format!("malformed multipart body: {what}"));
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut form = FormData::new();
    let mut position = find(body, delimiter, 0).ok_or_else(|| malformed("no boundary"))?;
    loop {
        position += delimiter.len();
        let rest = &body[position..];
        if rest.starts_with(b"--") {
            break;
        }
        if !rest.starts_with(b"\r\n") {
            return Err(malformed("expected line break after boundary"));
        }
        position += 2;

        let header_end =
            find(body, b"\r\n\r\n", position).ok_or_else(|| malformed("unterminated headers"))?;
        let headers = std::str::from_utf8(&body[position..header_end])
            .map_err(|_| malformed("headers are not UTF-8"))?;
        let content_start = header_end + 4;
        let next = find(body, delimiter, content_start).ok_or_else(|| malformed("no closing boundary"))?;
        let content_end = if body[..next].ends_with(b"\r\n") {
            next - 2
        } else {
            next
        };
        let content = &body[content_start..content_end.max(content_start)];

        let mut name = None;
        let mut filename = None;
        let mut content_type = None;
        for line in headers.split("\r\n") {
            let Some((header, value)) = line.split_once(':') else {
                continue;
            };
            if header.trim().eq_ignore_ascii_case("content-disposition") {
                name = DISPOSITION_NAME
                    .captures(value)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
                filename = DISPOSITION_FILENAME
                    .captures(value)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
            } else if header.trim().eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
            }
        }

        let name = name.ok_or_else(|| malformed("part without a name"))?;
        match filename {
            Some(filename) => form.append_file(
                name,
                filename,
                Blob::new(Bytes::copy_from_slice(content), content_type),
            ),
            None => form.append(name, String::from_utf8_lossy(content)),
        }
        position = next;
    }
    Ok(form)
}
