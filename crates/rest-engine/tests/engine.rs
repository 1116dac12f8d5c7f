mod common;

use common::client;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use parking_lot::Mutex;
use rest_engine::{
    FormData, OnRequest, OnResponse, OptionsStore, OverrideStrategy, QueryTransformer,
    ResponseData, ResponseFormat, ResponseType, RestOptions,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn json_options() -> RestOptions {
    RestOptions::new().response_type(ResponseFormat::Json)
}

fn mirror(response: &rest_engine::Response) -> Value {
    response.data.as_ref().and_then(ResponseData::as_json).cloned().unwrap()
}

#[tokio::test]
async fn test_get_json() {
    #[derive(Deserialize)]
    struct Model {
        fake: String,
    }

    let (client, transport) = client(json_options());
    let response = client.get("/json", None).await.unwrap();

    assert!(response.is_ok());
    assert_eq!(response.status, Some(StatusCode::OK));
    assert_eq!(response.json::<Model>().unwrap().unwrap().fake, "model");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_per_call_response_type() {
    let (client, _) = client(json_options());
    let response = client
        .get("/text", RestOptions::new().response_type(ResponseFormat::Text))
        .await
        .unwrap();
    assert_eq!(response.text(), Some("text"));

    let raw = client
        .get("/json", RestOptions::new().response_type(ResponseFormat::ArrayBuffer))
        .await
        .unwrap();
    assert_eq!(
        raw.data.as_ref().and_then(ResponseData::as_bytes).unwrap().as_ref(),
        br#"{"fake":"model"}"#
    );
}

#[tokio::test]
async fn test_response_type_resolver_is_recorded() {
    let (client, _) = client(RestOptions::new().response_type(ResponseType::from_fn(
        |_, response| match response.and_then(|r| r.content_type()) {
            Some(content_type) if content_type.starts_with("application/json") => {
                ResponseFormat::Json
            }
            _ => ResponseFormat::Text,
        },
    )));

    let json = client.get("/json", None).await.unwrap();
    assert_eq!(json.data, Some(ResponseData::Json(json!({"fake": "model"}))));
    assert_eq!(json.resolved_format, ResponseFormat::Json);
    assert!(json
        .request
        .options
        .response_type
        .as_ref()
        .is_some_and(|response_type| response_type.format().is_none()));

    let text = client.get("/text", None).await.unwrap();
    assert_eq!(text.text(), Some("text"));
}

#[tokio::test]
async fn test_repeat_runs_response_type_resolver_again() {
    let resolved = Arc::new(AtomicUsize::new(0));
    let (client, transport) = client(RestOptions::new().response_type(ResponseType::from_fn({
        let resolved = Arc::clone(&resolved);
        move |_, _| {
            resolved.fetch_add(1, Ordering::SeqCst);
            ResponseFormat::Json
        }
    })));

    let first = client.get("/json", None).await.unwrap();
    let repeated = first.repeat(()).await.unwrap();

    assert_eq!(resolved.load(Ordering::SeqCst), 2);
    assert_eq!(transport.calls(), 2);
    assert_eq!(repeated.resolved_format, ResponseFormat::Json);
    assert_eq!(repeated.data, Some(ResponseData::Json(json!({"fake": "model"}))));
}

#[tokio::test]
async fn test_empty_body_short_circuits_parsing() {
    let (client, _) = client(json_options());

    let no_content = client.get("/status-code/204/empty", None).await.unwrap();
    assert!(no_content.is_ok());
    assert_eq!(no_content.status, Some(StatusCode::NO_CONTENT));
    assert!(no_content.data.is_none());
    assert_eq!(no_content.resolved_format, ResponseFormat::None);
    assert_eq!(
        no_content.request.options.response_type.as_ref().and_then(ResponseType::format),
        Some(ResponseFormat::Json)
    );

    let empty_ok = client.get("/status-code/200/empty", None).await.unwrap();
    assert!(empty_ok.is_ok());
    assert!(empty_ok.data.is_none());
}

#[tokio::test]
async fn test_query_and_repeat_merge() {
    let (client, transport) = client(json_options());
    let first = client
        .get(
            "/mirror",
            RestOptions::new().query_param("a", "1").query_param("b", "2"),
        )
        .await
        .unwrap();
    assert_eq!(mirror(&first)["queryString"], "a=1&b=2");

    let repeated = first
        .repeat(RestOptions::new().query_param("c", 3))
        .await
        .unwrap();
    assert_eq!(mirror(&repeated)["queryString"], "a=1&b=2&c=3");
    assert_eq!(mirror(&repeated)["method"], "GET");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_repeat_with_assign_strategy() {
    let (client, _) = client(json_options().override_strategy(OverrideStrategy::Assign));
    let first = client
        .get("/mirror", RestOptions::new().query_param("a", "1"))
        .await
        .unwrap();
    let repeated = first
        .repeat(RestOptions::new().query_param("c", "3"))
        .await
        .unwrap();
    assert_eq!(mirror(&repeated)["queryString"], "c=3");
}

#[tokio::test]
async fn test_repeat_with_new_method() {
    let (client, _) = client(json_options());
    let first = client
        .get("/mirror", RestOptions::new().body(json!({"ignored": true})))
        .await
        .unwrap();
    assert_eq!(mirror(&first)["body"], Value::Null);

    let posted = first.repeat(Method::POST).await.unwrap();
    assert_eq!(mirror(&posted)["method"], "POST");
    assert_eq!(mirror(&posted)["body"], r#"{"ignored":true}"#);

    let put = first
        .repeat((Method::PUT, RestOptions::new().body(json!({"v": 2}))))
        .await
        .unwrap();
    assert_eq!(mirror(&put)["method"], "PUT");
    assert_eq!(mirror(&put)["body"], r#"{"v":2}"#);

    let same_method = first
        .repeat((None::<Method>, RestOptions::new().query_param("x", "y")))
        .await
        .unwrap();
    assert_eq!(mirror(&same_method)["method"], "GET");
    assert_eq!(mirror(&same_method)["queryString"], "x=y");
}

#[tokio::test]
async fn test_json_body_and_headers() {
    let (client, transport) = client(
        json_options().header(AUTHORIZATION, HeaderValue::from_static("Bearer global")),
    );
    let response = client
        .post(
            "/mirror",
            RestOptions::new()
                .body(json!({"hello": "world"}))
                .header(AUTHORIZATION, HeaderValue::from_static("Bearer local")),
        )
        .await
        .unwrap();

    let echoed = mirror(&response);
    assert_eq!(echoed["body"], r#"{"hello":"world"}"#);
    assert_eq!(echoed["headers"]["authorization"], "Bearer local");
    assert_eq!(echoed["headers"]["content-type"], "application/json");

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.method, Method::POST);
}

#[tokio::test]
async fn test_header_removed_by_override() {
    let (client, _) = client(
        json_options().header(AUTHORIZATION, HeaderValue::from_static("Bearer global")),
    );
    let response = client
        .get(
            "/mirror",
            RestOptions::new().header(AUTHORIZATION, HeaderValue::from_static("null")),
        )
        .await
        .unwrap();
    assert!(mirror(&response)["headers"].get("authorization").is_none());
}

#[tokio::test]
async fn test_multipart_body() {
    let (client, _) = client(json_options());
    let mut form = FormData::new();
    form.append("name", "value");

    let response = client
        .post("/mirror", RestOptions::new().body(form))
        .await
        .unwrap();
    let echoed = mirror(&response);
    let content_type = echoed["headers"]["content-type"].as_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(echoed["body"].as_str().unwrap().contains("name=\"name\""));
}

#[tokio::test]
async fn test_query_transformer() {
    let transformer = QueryTransformer::new(|_, value, _| match value {
        Value::Array(items) => Value::String(
            items
                .iter()
                .map(|item| item.as_str().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(";"),
        ),
        Value::Bool(_) => Value::Null,
        other => other.clone(),
    });
    let (client, _) = client(
        json_options()
            .query_params_transformer(transformer)
            .query_params_include_empty(true),
    );

    let response = client
        .get(
            "/mirror",
            RestOptions::new()
                .query_param("ids", json!(["a", "b"]))
                .query_param("flag", true)
                .query_param("n", 7),
        )
        .await
        .unwrap();
    assert_eq!(mirror(&response)["queryString"], "ids=a%3Bb&flag=&n=7");
}

#[tokio::test]
async fn test_invalid_transformer_output_is_returned_before_hooks() {
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let (client, transport) = client(
        json_options()
            .query_params_transformer(QueryTransformer::new(|_, _, _| json!({"nested": true})))
            .on_request(OnRequest::from_fn({
                let hook_calls = Arc::clone(&hook_calls);
                move |_| {
                    hook_calls.fetch_add(1, Ordering::SeqCst);
                }
            })),
    );

    let error = client
        .get("/mirror", RestOptions::new().query_param("a", "1"))
        .await
        .unwrap_err();
    assert!(error.is_url_parameter());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_async_on_request_is_awaited_before_send() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let (client, transport) = client(json_options().on_request(OnRequest::from_async_fn({
        let events = Arc::clone(&events);
        move |request| {
            let events = Arc::clone(&events);
            let path = request.url.path().to_string();
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                events.lock().push(format!("hook {path}"));
            }
        }
    })));

    let response = client.get("/json", None).await.unwrap();
    assert!(response.is_ok());
    assert_eq!(*events.lock(), vec!["hook /json".to_string()]);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_on_response_sees_every_completed_response() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (client, _) = client(json_options().on_response(OnResponse::new({
        let seen = Arc::clone(&seen);
        move |response| seen.lock().push(response.status)
    })));

    client.get("/json", None).await.unwrap();
    client.get("/status-code/404", None).await.unwrap();

    assert_eq!(
        *seen.lock(),
        vec![Some(StatusCode::OK), Some(StatusCode::NOT_FOUND)]
    );
}

#[tokio::test]
async fn test_store_create_client() {
    let mut store = OptionsStore::new(json_options().host(common::HOST));
    let transport = common::MockTransport::new();
    let first = store.create_client(transport.clone());

    store.merge(RestOptions::new().base_path("/missing"));
    let second = store.create_client(transport.clone());

    assert_eq!(first.get("/json", None).await.unwrap().status, Some(StatusCode::OK));
    assert_eq!(
        second.get("/json", None).await.unwrap().status,
        Some(StatusCode::NOT_FOUND)
    );
}

#[tokio::test]
async fn test_client_option_changes_apply_to_next_request() {
    let (client, transport) = client(json_options());
    client.merge_options(
        RestOptions::new().header(CONTENT_TYPE, HeaderValue::from_static("application/custom")),
    );
    client
        .post("/mirror", RestOptions::new().body("payload"))
        .await
        .unwrap();
    let sent = transport.last_request().unwrap();
    assert_eq!(sent.headers[CONTENT_TYPE], "application/custom");
}
