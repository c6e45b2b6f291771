//! Range server integration tests.
//!
//! Tests verify:
//! - Packed `bytes=s-e/t` ranges are served half-open
//! - RFC ranges are served inclusive
//! - Whole-resource responses without a Range header
//! - Error responses (missing resource, bad names, unsatisfiable ranges)

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use pyramid_fetch::{address_of, create_router, RouterConfig};

use super::test_utils::small_pyramid;

fn fixture() -> (TempDir, Router, Vec<u8>) {
    let (_, blob) = small_pyramid();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pyramid.bin"), &blob).unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("other.bin"), b"nested").unwrap();

    let router = create_router(dir.path(), RouterConfig::new().with_tracing(false));
    (dir, router, blob)
}

fn get(uri: &str, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_packed_range_served_half_open() {
    let (_dir, router, blob) = fixture();
    let (manifest, _) = small_pyramid();
    let range = address_of(&manifest, 1, 0, 1).unwrap();

    let response = router
        .oneshot(get("/packed/pyramid.bin", Some(&range.header_value())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 20-34/64");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "15");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &blob[20..35]);
}

#[tokio::test]
async fn test_rfc_range_served_inclusive() {
    let (_dir, router, blob) = fixture();

    let response = router
        .oneshot(get("/packed/pyramid.bin", Some("bytes=5-9")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 5-9/64");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &blob[5..10]);
}

#[tokio::test]
async fn test_open_ended_range() {
    let (_dir, router, blob) = fixture();

    let response = router
        .oneshot(get("/packed/pyramid.bin", Some("bytes=60-")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &blob[60..]);
}

#[tokio::test]
async fn test_whole_resource_without_range() {
    let (_dir, router, blob) = fixture();

    let response = router.oneshot(get("/packed/pyramid.bin", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::CACHE_CONTROL));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &blob[..]);
}

#[tokio::test]
async fn test_nested_resource() {
    let (_dir, router, _) = fixture();

    let response = router
        .oneshot(get("/packed/nested/other.bin", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"nested");
}

#[tokio::test]
async fn test_missing_resource_is_404() {
    let (_dir, router, _) = fixture();

    let response = router
        .oneshot(get("/packed/testpattern.blob.invalid", Some("bytes=0-10/64")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let (_dir, router, _) = fixture();

    let response = router
        .oneshot(get("/packed/nested/../../etc/passwd", None))
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::OK);
    assert_ne!(response.status(), StatusCode::PARTIAL_CONTENT);
}

#[tokio::test]
async fn test_total_size_mismatch_is_416() {
    let (_dir, router, _) = fixture();

    let response = router
        .oneshot(get("/packed/pyramid.bin", Some("bytes=0-3467/520078")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */64");
}

#[tokio::test]
async fn test_range_past_end_is_416() {
    let (_dir, router, _) = fixture();

    let response = router
        .oneshot(get("/packed/pyramid.bin", Some("bytes=64-100")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_malformed_range_is_400() {
    let (_dir, router, _) = fixture();

    let response = router
        .oneshot(get("/packed/pyramid.bin", Some("test")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "malformed_range");
}

#[tokio::test]
async fn test_health() {
    let (_dir, router, _) = fixture();

    let response = router.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_cors_preflight_allows_custom_headers() {
    let (_dir, router, _) = fixture();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/packed/pyramid.bin")
        .header(header::ORIGIN, "https://viewer.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "range, x-viewer-header")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
}
