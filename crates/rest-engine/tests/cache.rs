mod common;

use chrono::Utc;
use common::client;
use http::{Method, StatusCode};
use rest_engine::{OptionValue, OverrideStrategy, ResponseData, ResponseFormat, RestOptions};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

fn cached(key: &str) -> RestOptions {
    RestOptions::new().cache_in_memory(true).cache_key(key)
}

#[tokio::test(start_paused = true)]
async fn test_second_request_is_served_from_cache() {
    let (client, transport) = client(cached("k").response_type(ResponseFormat::Text));

    let start = Instant::now();
    let first = client
        .get("/reply-in/1000/milliseconds", None)
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_secs(1));

    let start = Instant::now();
    let second = client
        .get("/reply-in/1000/milliseconds", None)
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(10));

    assert_eq!(first.text(), Some("ok"));
    assert_eq!(second.text(), Some("ok"));
    assert_eq!(transport.calls(), 1);
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test]
async fn test_cache_is_opt_in() {
    let (client, transport) = client(RestOptions::new().cache_key("k"));
    client.get("/json", None).await.unwrap();
    client.get("/json", None).await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert_eq!(client.cache_len(), 0);
}

#[tokio::test]
async fn test_key_depends_on_url_and_method() {
    let (client, transport) = client(cached("k"));
    client.get("/json", None).await.unwrap();
    client
        .get("/json", RestOptions::new().query_param("page", 2))
        .await
        .unwrap();
    client.post("/json", None).await.unwrap();
    client.get("/json", None).await.unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(client.cache_len(), 3);
}

#[tokio::test]
async fn test_body_counts_only_for_declared_formats() {
    let (client, transport) = client(cached("k"));

    let post_as = |format: ResponseFormat| {
        RestOptions::new()
            .body("same body")
            .response_type(format)
    };

    client.post("/mirror", post_as(ResponseFormat::Json)).await.unwrap();
    client.post("/mirror", post_as(ResponseFormat::Text)).await.unwrap();
    assert_eq!(transport.calls(), 2);

    // Body does not contribute for binary formats, so these two collide.
    client.post("/mirror", post_as(ResponseFormat::Blob)).await.unwrap();
    client
        .post("/mirror", post_as(ResponseFormat::ArrayBuffer))
        .await
        .unwrap();
    assert_eq!(transport.calls(), 3);

    // Without a body the format never matters.
    client
        .get("/json", RestOptions::new().response_type(ResponseFormat::Json))
        .await
        .unwrap();
    let collided = client
        .get("/json", RestOptions::new().response_type(ResponseFormat::Text))
        .await
        .unwrap();
    assert_eq!(transport.calls(), 4);
    assert!(collided.data.as_ref().and_then(|d| d.as_json()).is_some());
}

#[tokio::test]
async fn test_failures_are_cached() {
    let (client, transport) = client(cached("errors").response_type(ResponseFormat::Json));
    let first = client.get("/status-code/500", None).await.unwrap();
    let second = client.get("/status-code/500", None).await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(
        second.error.unwrap().status_code,
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
    assert_eq!(first.status, second.status);
}

#[tokio::test]
async fn test_raised_errors_are_not_cached() {
    let (client, transport) = client(cached("errors").throw(true));
    assert!(client.get("/status-code/500", None).await.is_err());
    assert!(client.get("/status-code/500", None).await.is_err());
    assert_eq!(transport.calls(), 2);
    assert_eq!(client.cache_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expire_in_is_lazy() {
    let (client, transport) = client(cached("ttl").cache_expire_in(Duration::from_secs(1)));

    client.get("/json", None).await.unwrap();
    client.get("/json", None).await.unwrap();
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(client.cache_len(), 1);

    client.get("/json", None).await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired() {
    let (client, _) = client(cached("ttl"));
    client
        .get("/json", RestOptions::new().cache_expire_in(Duration::from_millis(100)))
        .await
        .unwrap();
    client.get("/text", None).await.unwrap();
    assert_eq!(client.cache_len(), 2);

    tokio::time::advance(Duration::from_millis(200)).await;
    assert_eq!(client.cache_purge_expired(), 1);
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test]
async fn test_expire_at_in_the_past() {
    let (client, transport) = client(
        cached("past").cache_expire_at(Utc::now() - chrono::Duration::minutes(1)),
    );
    client.get("/json", None).await.unwrap();
    client.get("/json", None).await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_clear_by_key() {
    let (client, transport) = client(RestOptions::new().cache_in_memory(true));
    let users = RestOptions::new().cache_key("users");
    let posts = RestOptions::new().cache_key(" posts ");

    client.get("/json", users.clone()).await.unwrap();
    client.get("/json", posts.clone()).await.unwrap();
    assert_eq!(transport.calls(), 2);

    client.cache_clear_by_key("");
    assert_eq!(client.cache_len(), 2);

    client.cache_clear_by_key("users");
    assert_eq!(client.cache_len(), 1);

    client.get("/json", users).await.unwrap();
    client.get("/json", posts).await.unwrap();
    assert_eq!(transport.calls(), 3);

    client.cache_clear();
    assert_eq!(client.cache_len(), 0);
}

#[tokio::test]
async fn test_cache_key_matches_lookup() {
    let (client, _) = client(cached("api"));
    let url = Url::parse("http://localhost:3000/json").unwrap();
    assert_eq!(
        client.cache_key(&url, &Method::GET, None),
        "api|http://localhost:3000/json|GET|"
    );
    assert_eq!(
        client.cache_key(&url, &Method::GET, Some("other")),
        "other|http://localhost:3000/json|GET|"
    );
}

#[tokio::test]
async fn test_cache_get_and_set_by_hand() {
    let (client, transport) = client(
        RestOptions::new()
            .cache_key("seed")
            .response_type(ResponseFormat::Json),
    );
    let url = Url::parse("http://localhost:3000/json").unwrap();
    assert!(client.cache_get(&url, &Method::GET, None).is_none());

    let response = client.get("/json", None).await.unwrap();
    assert_eq!(client.cache_len(), 0);

    client.cache_set(&response, None);
    client.cache_set(&response, Some("other"));
    assert_eq!(client.cache_len(), 2);

    let seeded = client.cache_get(&url, &Method::GET, None).unwrap();
    assert_eq!(
        seeded.data.as_ref().and_then(ResponseData::as_json).unwrap()["fake"],
        "model"
    );
    assert!(client.cache_get(&url, &Method::GET, Some("other")).is_some());
    assert!(client.cache_get(&url, &Method::POST, None).is_none());

    client.set_option(OptionValue::CacheInMemory(true));
    client.get("/json", None).await.unwrap();
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_options_override_resolves_without_mutating() {
    let (client, _) = client(RestOptions::new().query_param("a", "1"));

    let merged = client.options_override(RestOptions::new().query_param("b", "2"), None);
    assert_eq!(merged.query.unwrap().len(), 2);
    assert_eq!(merged.timeout, Some(Duration::from_secs(30)));

    let base = RestOptions::new()
        .query_param("x", "1")
        .override_strategy(OverrideStrategy::Assign);
    let assigned = client.options_override(RestOptions::new().query_param("y", "2"), Some(&base));
    let query = assigned.query.unwrap();
    assert_eq!(query.len(), 1);
    assert!(query.contains_key("y"));

    assert_eq!(client.options().query.unwrap().len(), 1);
}
