//! Header cascade integration tests.
//!
//! Tests verify:
//! - Per-tile Range headers from packed sources
//! - Precedence: tile > image > viewer
//! - Propagation of viewer and image updates
//! - Header snapshots frozen at dispatch
//! - Credentials flag resolution

use pyramid_fetch::{headers, Headers, ReadyState, TiledImageOptions};

use super::test_utils::{
    load_tile, packed_source, range_header, static_header_source, test_viewer,
    RecordingTransport,
};

fn merged<'a>(layers: impl IntoIterator<Item = &'a Headers>) -> Headers {
    let mut result = Headers::new();
    for layer in layers {
        result.extend(layer.clone());
    }
    result
}

// =============================================================================
// Per-tile Headers
// =============================================================================

#[tokio::test]
async fn test_loaded_event_includes_completed_request() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.open(packed_source());

    let event = load_tile(&viewer, &image, 0, 0, 0).await;

    assert_eq!(event.name(), "tile-loaded");
    assert_eq!(event.request().ready_state, ReadyState::Done);
    assert_eq!(event.request().status, Some(200));
}

#[tokio::test]
async fn test_headers_can_be_set_per_tile() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.open(packed_source());

    for (level, column, row) in [(0, 0, 0), (9, 1, 0), (10, 3, 2)] {
        let event = load_tile(&viewer, &image, level, column, row).await;
        let tile_headers = event.tile().ajax_headers().expect("resolved on dispatch");
        assert_eq!(tile_headers["Range"], range_header(level, column, row));
        assert_eq!(tile_headers["X-Viewer-Header"], "ViewerHeaderValue");
    }
}

#[tokio::test]
async fn test_first_tile_range_header() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.open(packed_source());

    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert_eq!(
        event.request().headers["Range"],
        "bytes=0-3467/520078"
    );
}

#[tokio::test]
async fn test_out_of_bounds_tile_is_rejected() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.open(packed_source());

    assert!(image.create_tile(11, 0, 0).is_err());
    assert!(image.create_tile(9, 2, 0).is_err());
    assert!(image.create_tile(9, 0, 2).is_err());
}

// =============================================================================
// Precedence
// =============================================================================

#[tokio::test]
async fn test_headers_are_propagated_correctly() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.add_tiled_image(
        TiledImageOptions::new(static_header_source(headers([(
            "X-Tile-Header",
            "TileHeaderValue",
        )])))
        .with_headers(headers([("X-TiledImage-Header", "TiledImageHeaderValue")])),
    );

    let event = load_tile(&viewer, &image, 0, 0, 0).await;

    assert_eq!(
        event.tile().ajax_headers(),
        Some(&headers([
            ("X-Viewer-Header", "ViewerHeaderValue"),
            ("X-TiledImage-Header", "TiledImageHeaderValue"),
            ("X-Tile-Header", "TileHeaderValue"),
        ]))
    );
}

#[tokio::test]
async fn test_viewer_headers_overwritten_by_image() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.add_tiled_image(
        TiledImageOptions::new(static_header_source(headers([(
            "X-Tile-Header",
            "TileHeaderValue",
        )])))
        .with_headers(headers([
            ("X-TiledImage-Header", "TiledImageHeaderValue"),
            ("X-Viewer-Header", "ViewerHeaderValue-Overwritten"),
        ])),
    );

    let event = load_tile(&viewer, &image, 0, 0, 0).await;

    assert_eq!(
        event.tile().ajax_headers(),
        Some(&headers([
            ("X-Viewer-Header", "ViewerHeaderValue-Overwritten"),
            ("X-TiledImage-Header", "TiledImageHeaderValue"),
            ("X-Tile-Header", "TileHeaderValue"),
        ]))
    );
}

#[tokio::test]
async fn test_image_headers_overwritten_by_tile() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.add_tiled_image(
        TiledImageOptions::new(static_header_source(headers([
            ("X-TiledImage-Header", "TiledImageHeaderValue-Overwritten"),
            ("X-Tile-Header", "TileHeaderValue"),
        ])))
        .with_headers(headers([("X-TiledImage-Header", "TiledImageHeaderValue")])),
    );

    let event = load_tile(&viewer, &image, 0, 0, 0).await;

    assert_eq!(
        event.tile().ajax_headers(),
        Some(&headers([
            ("X-Viewer-Header", "ViewerHeaderValue"),
            ("X-TiledImage-Header", "TiledImageHeaderValue-Overwritten"),
            ("X-Tile-Header", "TileHeaderValue"),
        ]))
    );
}

// =============================================================================
// Updates
// =============================================================================

#[tokio::test]
async fn test_viewer_headers_can_be_updated() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.open(packed_source());
    let first = headers([
        ("X-Viewer-Header", "ViewerHeaderValue-Updated"),
        ("X-Viewer-Header2", "ViewerHeaderValue2"),
    ]);
    let second = headers([("Range", "test")]);

    load_tile(&viewer, &image, 0, 0, 0).await;

    // Propagated replacement reaches image and tiles.
    viewer.set_ajax_headers(Some(first.clone()), true);
    let event = load_tile(&viewer, &image, 1, 0, 0).await;
    assert_eq!(viewer.ajax_headers(), first);
    assert_eq!(image.ajax_headers(), first);
    let mut expected = merged([&viewer.ajax_headers(), &image.ajax_headers()]);
    expected.insert("Range".to_string(), range_header(1, 0, 0));
    assert_eq!(event.tile().ajax_headers(), Some(&expected));

    // Replacement is wholesale, and the tile's Range still wins.
    viewer.set_ajax_headers(Some(second.clone()), true);
    let event = load_tile(&viewer, &image, 2, 0, 0).await;
    assert_eq!(viewer.ajax_headers(), second);
    assert_eq!(image.ajax_headers(), second);
    let tile_headers = event.tile().ajax_headers().unwrap();
    assert!(!tile_headers.contains_key("X-Viewer-Header"));
    assert!(!tile_headers.contains_key("X-Viewer-Header2"));
    assert_eq!(tile_headers["Range"], range_header(2, 0, 0));

    // Without propagation only the viewer value changes.
    viewer.set_ajax_headers(Some(first.clone()), false);
    let event = load_tile(&viewer, &image, 3, 0, 0).await;
    assert_eq!(viewer.ajax_headers(), first);
    assert_eq!(image.ajax_headers(), second);
    let tile_headers = event.tile().ajax_headers().unwrap();
    assert!(!tile_headers.contains_key("X-Viewer-Header"));
    assert!(!tile_headers.contains_key("X-Viewer-Header2"));
}

#[tokio::test]
async fn test_image_headers_can_be_updated() {
    let viewer = test_viewer(RecordingTransport::new());
    let tile_source_headers = headers([("X-Tile-Header", "TileHeaderValue")]);
    let first = headers([
        ("X-TiledImage-Header", "TiledImageHeaderValue-Updated"),
        ("X-TiledImage-Header2", "TiledImageHeaderValue2"),
    ]);
    let second = headers([
        ("X-Viewer-Header", "ViewerHeaderValue-Updated"),
        ("X-Tile-Header", "TileHeaderValue-Updated"),
    ]);
    let viewer_headers = headers([("X-Viewer-Header", "ViewerHeaderValue")]);

    let image = viewer.add_tiled_image(
        TiledImageOptions::new(static_header_source(tile_source_headers.clone()))
            .with_headers(headers([("X-TiledImage-Header", "TiledImageHeaderValue")])),
    );
    load_tile(&viewer, &image, 0, 0, 0).await;

    image.set_ajax_headers(Some(first.clone()), true);
    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert_eq!(viewer.ajax_headers(), viewer_headers);
    assert_eq!(image.own_headers(), first);
    assert_eq!(image.ajax_headers(), merged([&viewer_headers, &first]));
    assert_eq!(
        event.tile().ajax_headers(),
        Some(&merged([&viewer_headers, &first, &tile_source_headers]))
    );

    // Image headers overriding viewer and tile keys; the tile still wins.
    image.set_ajax_headers(Some(second.clone()), true);
    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert_eq!(viewer.ajax_headers(), viewer_headers);
    assert_eq!(image.own_headers(), second);
    assert_eq!(image.ajax_headers(), merged([&viewer_headers, &second]));
    assert_eq!(
        event.tile().ajax_headers(),
        Some(&merged([&viewer_headers, &second, &tile_source_headers]))
    );

    // Cleared without propagation: new tiles keep the last published value.
    image.set_ajax_headers(None, false);
    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert_eq!(viewer.ajax_headers(), viewer_headers);
    assert!(image.own_headers().is_empty());
    assert_eq!(image.ajax_headers(), viewer_headers);
    assert_eq!(
        event.tile().ajax_headers(),
        Some(&merged([&viewer_headers, &second, &tile_source_headers]))
    );
}

#[tokio::test]
async fn test_viewer_update_reaches_every_image() {
    let viewer = test_viewer(RecordingTransport::new());
    let a = viewer.open(packed_source());
    let b = viewer.add_tiled_image(
        TiledImageOptions::new(packed_source()).with_headers(headers([("X-Image", "b")])),
    );

    viewer.set_ajax_headers(Some(headers([("X-Viewer-Header", "v2")])), true);

    let event_a = load_tile(&viewer, &a, 0, 0, 0).await;
    let event_b = load_tile(&viewer, &b, 0, 0, 0).await;
    assert_eq!(event_a.request().headers["X-Viewer-Header"], "v2");
    assert_eq!(event_b.request().headers["X-Viewer-Header"], "v2");
    assert_eq!(event_b.request().headers["X-Image"], "b");
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn test_headers_frozen_at_dispatch() {
    let transport = RecordingTransport::new();
    let viewer = test_viewer(transport.clone());
    let image = viewer.open(packed_source());

    let tile = image.create_tile(0, 0, 0).unwrap();
    let outcome = viewer.events().next_for(&tile);
    viewer.dispatch(&tile).unwrap();

    viewer.set_ajax_headers(Some(headers([("X-Viewer-Header", "changed")])), true);
    image.set_ajax_headers(Some(headers([("X-Late", "1")])), true);

    let event = outcome.await.unwrap();
    assert_eq!(event.request().headers["X-Viewer-Header"], "ViewerHeaderValue");
    assert!(!event.request().headers.contains_key("X-Late"));
    assert_eq!(
        tile.ajax_headers().unwrap()["X-Viewer-Header"],
        "ViewerHeaderValue"
    );

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].headers["X-Viewer-Header"], "ViewerHeaderValue");
}

#[tokio::test]
async fn test_queued_tile_resolves_at_dispatch_not_creation() {
    let viewer = test_viewer(RecordingTransport::new());
    let image = viewer.open(packed_source());

    let tile = image.create_tile(0, 0, 0).unwrap();
    assert!(tile.ajax_headers().is_none());

    viewer.set_ajax_headers(Some(headers([("X-Viewer-Header", "later")])), true);
    let outcome = viewer.events().next_for(&tile);
    viewer.dispatch(&tile).unwrap();

    let event = outcome.await.unwrap();
    assert_eq!(event.request().headers["X-Viewer-Header"], "later");
}

// =============================================================================
// Credentials
// =============================================================================

#[tokio::test]
async fn test_with_credentials_set_from_image() {
    let transport = RecordingTransport::new();
    let viewer = test_viewer(transport.clone());
    let image =
        viewer.add_tiled_image(TiledImageOptions::new(packed_source()).with_credentials(true));

    let event = load_tile(&viewer, &image, 0, 0, 0).await;

    assert!(event.is_loaded());
    assert_eq!(event.request().ready_state, ReadyState::Done);
    assert!(event.request().with_credentials);
    assert!(transport.requests()[0].with_credentials);
}

#[tokio::test]
async fn test_credentials_default_to_viewer_then_false() {
    let transport = RecordingTransport::new();
    let viewer = test_viewer(transport.clone());
    let image = viewer.open(packed_source());

    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert!(!event.request().with_credentials);

    viewer.set_ajax_with_credentials(true);
    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert!(event.request().with_credentials);

    image.set_ajax_with_credentials(false);
    let event = load_tile(&viewer, &image, 0, 0, 0).await;
    assert!(!event.request().with_credentials);
    assert!(!image.ajax_with_credentials());
}
