//! End-to-end tests over a real listener.
//!
//! Tests verify:
//! - Tiles fetched with `HttpTransport` from the range server match the
//!   packed bytes
//! - HTTP failures surface as `tile-load-failed`
//! - Resolved and ambient credential headers reach the wire
//! - Relative tile URLs are joined onto the transport's base URL

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;

use pyramid_fetch::{
    create_router, headers, HttpTransport, PackedTileSource, RouterConfig, TemplateTileSource,
    TileEvent, TiledImageOptions, TransportError, Viewer, ViewerOptions,
};

use super::test_utils::{load_tile, small_pyramid};

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn spawn_range_server() -> (TempDir, SocketAddr, Vec<u8>) {
    let (_, blob) = small_pyramid();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pyramid.bin"), &blob).unwrap();
    let addr = spawn(create_router(dir.path(), RouterConfig::new().with_tracing(false))).await;
    (dir, addr, blob)
}

/// Echoes the `x-token` and `authorization` request headers.
async fn spawn_echo_server() -> SocketAddr {
    async fn echo(headers: HeaderMap) -> String {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        format!("{}|{}", value("x-token"), value("authorization"))
    }
    spawn(Router::new().route("/echo", get(echo))).await
}

#[tokio::test]
async fn test_fetch_level_from_range_server() {
    let (_dir, addr, blob) = spawn_range_server().await;
    let (manifest, _) = small_pyramid();
    let manifest = Arc::new(manifest);

    let viewer = Viewer::new(
        ViewerOptions::default(),
        Arc::new(HttpTransport::new().unwrap()),
    );
    let image = viewer.open(Arc::new(PackedTileSource::new(
        format!("http://{}/packed/pyramid.bin", addr),
        Arc::clone(&manifest),
    )));

    for (column, row) in manifest.tiles_at(1) {
        let event = load_tile(&viewer, &image, 1, column, row).await;
        let range = pyramid_fetch::address_of(&manifest, 1, column, row).unwrap();

        assert!(event.is_loaded(), "tile {}/{} failed", column, row);
        assert_eq!(event.request().status, Some(206));
        let body = event.request().body.clone().unwrap();
        assert_eq!(&body[..], &blob[range.start as usize..range.end as usize]);
    }
    assert_eq!(viewer.requests().in_flight(), 0);
}

#[tokio::test]
async fn test_missing_resource_fails_tile() {
    let (_dir, addr, _) = spawn_range_server().await;

    let viewer = Viewer::new(
        ViewerOptions::default(),
        Arc::new(HttpTransport::new().unwrap()),
    );
    let image = viewer.open(Arc::new(TemplateTileSource::new(format!(
        "http://{}/packed/testpattern.blob.invalid",
        addr
    ))));

    match load_tile(&viewer, &image, 0, 0, 0).await {
        TileEvent::LoadFailed { error, request, .. } => {
            assert_eq!(error, TransportError::Http { status: 404 });
            assert_eq!(request.status, Some(404));
        }
        other => panic!("expected failure, got {}", other.name()),
    }
}

#[tokio::test]
async fn test_resolved_headers_reach_the_wire() {
    let addr = spawn_echo_server().await;

    let viewer = Viewer::new(
        ViewerOptions::default().with_headers(headers([("x-token", "viewer")])),
        Arc::new(HttpTransport::new().unwrap()),
    );
    let image = viewer.add_tiled_image(
        TiledImageOptions::new(Arc::new(TemplateTileSource::new(format!(
            "http://{}/echo",
            addr
        ))))
        .with_headers(headers([("x-token", "image")])),
    );

    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    let body = event.request().body.clone().unwrap();
    assert_eq!(&body[..], b"image|-");
}

#[tokio::test]
async fn test_ambient_credentials_only_with_flag() {
    let addr = spawn_echo_server().await;
    let transport = HttpTransport::new()
        .unwrap()
        .with_ambient_credentials(headers([("authorization", "Bearer secret")]));

    let viewer = Viewer::new(ViewerOptions::default(), Arc::new(transport));
    let source = Arc::new(TemplateTileSource::new(format!("http://{}/echo", addr)));
    let anonymous = viewer.open(source.clone());
    let credentialed =
        viewer.add_tiled_image(TiledImageOptions::new(source).with_credentials(true));

    let event = load_tile(&viewer, &anonymous, 0, 0, 0).await;
    assert_eq!(&event.request().body.clone().unwrap()[..], b"-|-");

    let event = load_tile(&viewer, &credentialed, 0, 0, 0).await;
    assert!(event.request().with_credentials);
    assert_eq!(
        &event.request().body.clone().unwrap()[..],
        b"-|Bearer secret"
    );
}

#[tokio::test]
async fn test_relative_tile_url_joined_onto_base() {
    let (_dir, addr, blob) = spawn_range_server().await;
    let base = url::Url::parse(&format!("http://{}/viewer/index.html", addr)).unwrap();

    let viewer = Viewer::new(
        ViewerOptions::default(),
        Arc::new(HttpTransport::new().unwrap().with_base_url(base)),
    );
    let image = viewer.open(Arc::new(TemplateTileSource::new("/packed/pyramid.bin")));

    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert!(event.is_loaded());
    assert_eq!(event.request().status, Some(200));
    assert_eq!(&event.request().body.clone().unwrap()[..], &blob[..]);
}
