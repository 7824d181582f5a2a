//! Revalidation endpoint behavior over HTTP.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use revalidator::application::revalidate::RevalidationService;
use revalidator::application::secret::SharedSecret;
use revalidator::cache::{
    CACHE_STATUS_HEADER, CacheConfig, CachePartitions, PageCache, RevalidateError,
};
use revalidator::infra::http::{EndpointState, REQUEST_ID_HEADER, build_endpoint_router};

const SECRET: &str = "test-secret-key";

#[derive(Default)]
struct FakePartitions {
    calls: Mutex<Vec<String>>,
    fail_path: bool,
}

impl CachePartitions for FakePartitions {
    fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError> {
        self.calls.lock().unwrap().push(format!("path:{path}"));
        if self.fail_path {
            return Err(RevalidateError::Backend("Revalidation failed".to_string()));
        }
        Ok(())
    }

    fn revalidate_tag(&self, tag: &str) -> Result<(), RevalidateError> {
        self.calls.lock().unwrap().push(format!("tag:{tag}"));
        Ok(())
    }
}

fn fake_app(partitions: Arc<FakePartitions>) -> Router {
    let revalidation = RevalidationService::new(SharedSecret::new(SECRET), partitions);
    build_endpoint_router(EndpointState {
        revalidation: Arc::new(revalidation),
        cache: PageCache::new(CacheConfig::default()),
    })
}

fn cached_app() -> Router {
    let cache = PageCache::new(CacheConfig::default());
    let revalidation =
        RevalidationService::new(SharedSecret::new(SECRET), Arc::new(cache.clone()));
    build_endpoint_router(EndpointState {
        revalidation: Arc::new(revalidation),
        cache,
    })
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/revalidate")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn post_json(payload: Value) -> Request<Body> {
    post(payload.to_string())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn page(app: &Router, uri: &str) -> (String, String) {
    let response = app.clone().oneshot(get(uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cache_status = response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (cache_status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn valid_path_is_revalidated() {
    let partitions = Arc::new(FakePartitions::default());
    let app = fake_app(partitions.clone());

    let (status, body) = send(
        &app,
        post_json(json!({ "path": "/test-path", "secret": SECRET })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revalidated"], json!(["path: /test-path"]));
    assert!(body.get("errors").is_none());
    assert!(body["timestamp"].is_string());
    assert_eq!(*partitions.calls.lock().unwrap(), vec!["path:/test-path"]);
}

#[tokio::test]
async fn valid_tag_is_revalidated() {
    let app = fake_app(Arc::new(FakePartitions::default()));

    let (status, body) = send(&app, post_json(json!({ "tag": "posts", "secret": SECRET }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revalidated"], json!(["tag: posts"]));
}

#[tokio::test]
async fn path_and_tag_are_both_revalidated() {
    let partitions = Arc::new(FakePartitions::default());
    let app = fake_app(partitions.clone());

    let (status, body) = send(
        &app,
        post_json(json!({ "path": "/test-path", "tag": "posts", "secret": SECRET })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revalidated"], json!(["path: /test-path", "tag: posts"]));
    assert_eq!(
        *partitions.calls.lock().unwrap(),
        vec!["path:/test-path", "tag:posts"]
    );
}

#[tokio::test]
async fn invalid_secret_is_rejected_before_any_invalidation() {
    let partitions = Arc::new(FakePartitions::default());
    let app = fake_app(partitions.clone());

    let (status, body) = send(
        &app,
        post_json(json!({ "path": "/test-path", "secret": "invalid-secret" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid secret" }));
    assert!(partitions.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_and_empty_secrets_are_rejected() {
    let partitions = Arc::new(FakePartitions::default());
    let app = fake_app(partitions.clone());

    for payload in [
        json!({ "path": "/test-path" }),
        json!({ "path": "/test-path", "secret": "" }),
    ] {
        let (status, _) = send(&app, post_json(payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    assert!(partitions.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unset_secret_rejects_everything() {
    let partitions = Arc::new(FakePartitions::default());
    let revalidation = RevalidationService::new(None, partitions.clone());
    let app = build_endpoint_router(EndpointState {
        revalidation: Arc::new(revalidation),
        cache: PageCache::new(CacheConfig::default()),
    });

    let (status, _) = send(
        &app,
        post_json(json!({ "path": "/test-path", "secret": SECRET })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(partitions.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_targets_are_a_bad_request() {
    let app = fake_app(Arc::new(FakePartitions::default()));

    let (status, body) = send(&app, post_json(json!({ "secret": SECRET }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Either path or tag must be provided" }));
}

#[tokio::test]
async fn failing_path_reports_multi_status() {
    let partitions = Arc::new(FakePartitions {
        fail_path: true,
        ..Default::default()
    });
    let app = fake_app(partitions);

    let (status, body) = send(
        &app,
        post_json(json!({ "path": "/test-path", "secret": SECRET })),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(
        body["errors"],
        json!(["Failed to revalidate path /test-path: Revalidation failed"])
    );
    assert!(body.get("revalidated").is_none());
}

#[tokio::test]
async fn failing_path_does_not_block_tag() {
    let partitions = Arc::new(FakePartitions {
        fail_path: true,
        ..Default::default()
    });
    let app = fake_app(partitions.clone());

    let (status, body) = send(
        &app,
        post_json(json!({ "path": "/test-path", "tag": "posts", "secret": SECRET })),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["revalidated"], json!(["tag: posts"]));
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(partitions.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_body_is_an_internal_error() {
    let app = fake_app(Arc::new(FakePartitions::default()));

    let (status, body) = send(&app, post("{not json")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn descriptor_is_served_without_authentication() {
    let app = fake_app(Arc::new(FakePartitions::default()));

    let (status, body) = send(&app, get("/api/revalidate")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "revalidation-endpoint");
    assert_eq!(body["supportedMethods"], json!(["POST"]));
    assert_eq!(body["requiredFields"], json!(["secret", "path or tag"]));
    assert_eq!(body["example"]["path"], "/posts");
}

#[tokio::test]
async fn repeated_path_revalidation_is_idempotent() {
    let app = cached_app();

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            post_json(json!({ "path": "/posts", "secret": SECRET })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revalidated"], json!(["path: /posts"]));
    }
}

#[tokio::test]
async fn malformed_keys_fail_individually() {
    let app = cached_app();

    let (status, body) = send(
        &app,
        post_json(json!({ "path": "no-leading-slash", "tag": "posts", "secret": SECRET })),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["revalidated"], json!(["tag: posts"]));
    let errors = body["errors"].as_array().expect("errors");
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0]
            .as_str()
            .unwrap()
            .starts_with("Failed to revalidate path no-leading-slash: ")
    );
}

#[tokio::test]
async fn path_revalidation_evicts_cached_page() {
    let app = cached_app();

    let (first, body) = page(&app, "/posts/1").await;
    assert_eq!(first, "MISS");
    let (second, cached_body) = page(&app, "/posts/1").await;
    assert_eq!(second, "HIT");
    assert_eq!(body, cached_body);

    let (status, _) = send(&app, post_json(json!({ "path": "/posts/1", "secret": SECRET }))).await;
    assert_eq!(status, StatusCode::OK);

    let (after, _) = page(&app, "/posts/1").await;
    assert_eq!(after, "MISS");
}

#[tokio::test]
async fn tag_revalidation_evicts_every_tagged_page() {
    let app = cached_app();

    page(&app, "/posts/1").await;
    page(&app, "/posts/2").await;
    page(&app, "/categories").await;

    let (status, _) = send(&app, post_json(json!({ "tag": "posts", "secret": SECRET }))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(page(&app, "/posts/1").await.0, "MISS");
    assert_eq!(page(&app, "/posts/2").await.0, "MISS");
    assert_eq!(page(&app, "/categories").await.0, "HIT");
}

#[tokio::test]
async fn rejected_secret_leaves_cache_untouched() {
    let app = cached_app();

    page(&app, "/").await;
    let (status, _) = send(&app, post_json(json!({ "tag": "home", "secret": "wrong" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(page(&app, "/").await.0, "HIT");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = fake_app(Arc::new(FakePartitions::default()));

    let response = app.oneshot(get("/api/revalidate")).await.unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}
