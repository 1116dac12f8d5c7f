//! In-memory test server for integration tests.
//!
//! Routes:
//! - `/json` returns `{"fake": "model"}`
//! - `/text` returns `text`
//! - `/status-code/{code}` returns that status with a JSON body
//! - `/status-code/{code}/empty` returns that status with no body
//! - `/mirror` echoes method, query string, query object, headers and body
//! - `/reply-in/{ms}/milliseconds` answers `ok` after a delay
//! - `/not-json` returns a broken JSON body
//! - `/network-error` fails at the transport level

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use parking_lot::Mutex;
use rest_engine::{
    RestClient, RestOptions, Transport, TransportError, TransportRequest, TransportResponse,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const HOST: &str = "http://localhost:3000";

#[derive(Default)]
pub struct MockTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if request.signal.aborted() {
            return Err(TransportError::Aborted);
        }
        let signal = request.signal.clone();
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(TransportError::Aborted),
            result = route(request) => result,
        }
    }
}

fn json_response(request: &TransportRequest, status: StatusCode, body: &Value) -> TransportResponse {
    TransportResponse::new(request.url.clone(), status).with_json(body)
}

fn text_response(request: &TransportRequest, body: &'static str) -> TransportResponse {
    TransportResponse::new(request.url.clone(), StatusCode::OK)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .with_body(body)
}

async fn route(request: TransportRequest) -> Result<TransportResponse, TransportError> {
    let path = request.url.path().trim_start_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').collect();

    let response = match segments.as_slice() {
        ["json"] => json_response(&request, StatusCode::OK, &json!({"fake": "model"})),
        ["text"] => text_response(&request, "text"),
        ["status-code", code] => {
            let status = parse_status(code)?;
            json_response(
                &request,
                status,
                &json!({"statusText": "CustomStatusCode", "statusCode": status.as_u16()}),
            )
            .with_status_text("CustomStatusCode")
        }
        ["status-code", code, "empty"] => {
            let status = parse_status(code)?;
            TransportResponse::new(request.url.clone(), status).with_body(Bytes::new())
        }
        ["mirror"] => {
            let query_object: Map<String, Value> = request
                .url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            let headers: Map<String, Value> = request
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        Value::String(value.to_str().unwrap_or_default().to_string()),
                    )
                })
                .collect();
            let body = request
                .body
                .as_ref()
                .map(|b| Value::String(String::from_utf8_lossy(b).into_owned()))
                .unwrap_or(Value::Null);
            json_response(
                &request,
                StatusCode::OK,
                &json!({
                    "method": request.method.as_str(),
                    "queryString": request.url.query().unwrap_or_default(),
                    "queryObject": query_object,
                    "headers": headers,
                    "body": body,
                }),
            )
        }
        ["reply-in", ms, "milliseconds"] => {
            let ms: u64 = ms
                .parse()
                .map_err(|_| TransportError::network(format!("bad delay '{ms}'")))?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            text_response(&request, "ok")
        }
        ["not-json"] => TransportResponse::new(request.url.clone(), StatusCode::OK)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{\"unterminated\": "),
        ["network-error"] => {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(TransportError::from_source(io));
        }
        _ => json_response(&request, StatusCode::NOT_FOUND, &json!({"error": "not found"})),
    };
    Ok(response)
}

fn parse_status(code: &str) -> Result<StatusCode, TransportError> {
    code.parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| TransportError::network(format!("bad status '{code}'")))
}

/// Client over a fresh mock, pointed at [`HOST`].
pub fn client(options: RestOptions) -> (RestClient, Arc<MockTransport>) {
    let transport = MockTransport::new();
    let client = RestClient::new(options.host(HOST), transport.clone());
    (client, transport)
}
