//! # pyramid-fetch
//!
//! The tile request subsystem of a deep zoom viewer.
//!
//! A viewer displays one or more tiled images, each a pyramid of tiles
//! fetched over HTTP. This library decides which headers each tile request
//! carries, addresses tiles inside a single packed resource through HTTP
//! range requests, and runs the asynchronous request lifecycle that turns a
//! queued tile into a loaded, failed or cancelled one.
//!
//! ## Features
//!
//! - **Header cascade**: viewer, image and tile-level headers with explicit
//!   propagation and per-dispatch snapshots
//! - **Packed pyramids**: a manifest of byte ranges maps `(level, column, row)`
//!   to a `Range: bytes=<start>-<end>/<total>` header
//! - **Request lifecycle**: async fetches with cancellation, timeouts and
//!   `tile-loaded` / `tile-load-failed` events
//! - **Range server**: an axum server for packed resources
//!
//! ## Architecture
//!
//! - [`scope`] - Header and credential scopes with published snapshots
//! - [`resolver`] - Merges the scopes into a tile's effective headers
//! - [`manifest`] - Tile-range manifest and tile addressing
//! - [`source`] - Tile sources (packed resource, URL template)
//! - [`tile`] - Tile descriptors and lifecycle states
//! - [`viewer`] - Viewer and tiled-image owners of the scopes
//! - [`request`] - Transports, request manager and events
//! - [`server`] - Axum-based range server
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pyramid_fetch::{
//!     headers, HttpTransport, PackedTileSource, PyramidManifest, TileEvent, Viewer,
//!     ViewerOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = Arc::new(PyramidManifest::load("pyramid.json").await?);
//!     let viewer = Viewer::new(
//!         ViewerOptions::default().with_headers(headers([("X-Session", "abc")])),
//!         Arc::new(HttpTransport::new()?),
//!     );
//!
//!     let source = PackedTileSource::new("https://example.com/pyramid.bin", manifest);
//!     let image = viewer.open(Arc::new(source));
//!
//!     let tile = image.create_tile(0, 0, 0)?;
//!     let done = viewer.events().next_for(&tile);
//!     viewer.dispatch(&tile)?;
//!
//!     if let Some(TileEvent::Loaded { request, .. }) = done.await {
//!         println!("{} bytes", request.body.map(|b| b.len()).unwrap_or(0));
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manifest;
pub mod request;
pub mod resolver;
pub mod scope;
pub mod server;
pub mod source;
pub mod tile;
pub mod viewer;

// Re-export commonly used types
pub use config::{AddressConfig, AddressOutputFormat, Cli, Command, FetchConfig, ServeConfig};
pub use error::{AddressingError, LifecycleError, ManifestError, ServeError, TransportError};
pub use manifest::{address_of, ByteRange, PyramidManifest, TileRanges, RANGE_HEADER};
pub use request::{
    BroadcastEvents, EventSink, HttpTransport, ReadyState, RequestManager, TileEvent,
    TileRequestHandle, TileTransport, TransportRequest, TransportResponse,
    DEFAULT_EVENT_CAPACITY,
};
pub use resolver::{HeaderResolver, ResolvedHeaders};
pub use scope::{headers, ConfigScope, Headers, ScopeSnapshot};
pub use server::{create_router, AppState, RangeRequest, RouterConfig};
pub use source::{PackedTileSource, TemplateTileSource, TileSource};
pub use tile::{TileDescriptor, TileState};
pub use viewer::{TiledImage, TiledImageOptions, Viewer, ViewerOptions};
