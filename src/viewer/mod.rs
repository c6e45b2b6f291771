//! Owners of the configuration scopes.
//!
//! A [`Viewer`] owns the viewer-level scope, the images it displays and the
//! request manager that fetches their tiles. Each [`TiledImage`] owns its
//! image-level scope and its tile source.
//!
//! # Propagation
//!
//! ```text
//! viewer.set_ajax_headers(h, true)   viewer scope published,
//!                                    every image scope re-published
//! viewer.set_ajax_headers(h, false)  viewer scope updated only
//! image.set_ajax_headers(h, true)    image scope published
//! image.set_ajax_headers(h, false)   image scope updated only
//! ```
//!
//! "Published" is what tiles dispatched afterwards resolve against. Tiles that
//! were already dispatched keep their frozen headers either way.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pyramid_fetch::request::HttpTransport;
//! use pyramid_fetch::scope::headers;
//! use pyramid_fetch::source::TemplateTileSource;
//! use pyramid_fetch::viewer::{TiledImageOptions, Viewer, ViewerOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let viewer = Viewer::new(
//!     ViewerOptions::default().with_headers(headers([("X-Viewer-Header", "A")])),
//!     Arc::new(HttpTransport::new()?),
//! );
//! let image = viewer.add_tiled_image(TiledImageOptions::new(Arc::new(
//!     TemplateTileSource::new("https://tiles.example.com/{level}/{x}_{y}.jpg"),
//! )));
//!
//! let loaded = viewer.events().next_loaded();
//! viewer.dispatch(&image.create_tile(0, 0, 0)?)?;
//! let event = loaded.await;
//! # Ok(())
//! # }
//! ```

mod image;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::LifecycleError;
use crate::request::{BroadcastEvents, RequestManager, TileTransport, DEFAULT_EVENT_CAPACITY};
use crate::scope::{ConfigScope, Headers};
use crate::source::TileSource;
use crate::tile::TileDescriptor;

pub use image::{TiledImage, TiledImageOptions};

// =============================================================================
// Viewer Options
// =============================================================================

/// Options for creating a viewer.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Viewer-scope headers
    pub ajax_headers: Headers,

    /// Viewer-scope credentials flag
    pub ajax_with_credentials: bool,

    /// Per-request timeout (None = wait for the transport)
    pub request_timeout: Option<Duration>,

    /// Buffer size of the lifecycle event channel
    pub event_capacity: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            ajax_headers: Headers::new(),
            ajax_with_credentials: false,
            request_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ViewerOptions {
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.ajax_headers = headers;
        self
    }

    pub fn with_credentials(mut self, flag: bool) -> Self {
        self.ajax_with_credentials = flag;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

// =============================================================================
// Viewer
// =============================================================================

/// Deep zoom viewer, as far as tile requests are concerned.
///
/// Dropping the viewer discards its scope; there is no global header state.
pub struct Viewer {
    scope: Arc<ConfigScope>,
    images: RwLock<Vec<Arc<TiledImage>>>,
    events: Arc<BroadcastEvents>,
    requests: RequestManager,
}

impl Viewer {
    /// Create a viewer fetching tiles through `transport`.
    pub fn new(options: ViewerOptions, transport: Arc<dyn TileTransport>) -> Self {
        let events = Arc::new(BroadcastEvents::new(options.event_capacity));
        let mut requests = RequestManager::new(transport, events.clone());
        if let Some(timeout) = options.request_timeout {
            requests = requests.with_timeout(timeout);
        }

        Self {
            scope: Arc::new(ConfigScope::new(
                options.ajax_headers,
                Some(options.ajax_with_credentials),
            )),
            images: RwLock::new(Vec::new()),
            events,
            requests,
        }
    }

    /// Replace the viewer headers.
    ///
    /// With `propagate`, every image re-publishes its scope on top of the new
    /// viewer value, so subsequent dispatches pick both up.
    pub fn set_ajax_headers(&self, headers: Option<Headers>, propagate: bool) {
        self.scope.set_headers(headers, propagate);
        if propagate {
            let images = self.images.read();
            for image in images.iter() {
                image.scope().publish();
            }
            debug!(images = images.len(), "Propagated viewer headers");
        }
    }

    pub fn set_ajax_with_credentials(&self, flag: bool) {
        self.scope.set_credentials(flag);
    }

    /// Viewer headers as last written.
    pub fn ajax_headers(&self) -> Headers {
        self.scope.snapshot().headers().clone()
    }

    pub fn ajax_with_credentials(&self) -> bool {
        self.scope.snapshot().credentials().unwrap_or(false)
    }

    pub fn scope(&self) -> &Arc<ConfigScope> {
        &self.scope
    }

    /// Add an image displaying tiles from `options.source`.
    pub fn add_tiled_image(&self, options: TiledImageOptions) -> Arc<TiledImage> {
        let image = TiledImage::new(Arc::clone(&self.scope), options);
        self.images.write().push(Arc::clone(&image));
        info!(images = self.images.read().len(), "Added tiled image");
        image
    }

    /// Add an image with no image-level configuration.
    pub fn open(&self, source: Arc<dyn TileSource>) -> Arc<TiledImage> {
        self.add_tiled_image(TiledImageOptions::new(source))
    }

    /// Detach an image. Its in-flight tiles are unaffected.
    pub fn remove_tiled_image(&self, image: &Arc<TiledImage>) -> bool {
        let mut images = self.images.write();
        let before = images.len();
        images.retain(|i| !Arc::ptr_eq(i, image));
        images.len() != before
    }

    pub fn images(&self) -> Vec<Arc<TiledImage>> {
        self.images.read().clone()
    }

    /// Lifecycle events for tiles dispatched through this viewer.
    pub fn events(&self) -> &Arc<BroadcastEvents> {
        &self.events
    }

    pub fn requests(&self) -> &RequestManager {
        &self.requests
    }

    /// Dispatch a queued tile. See [`RequestManager::dispatch`].
    pub fn dispatch(&self, tile: &TileDescriptor) -> Result<(), LifecycleError> {
        self.requests.dispatch(tile)
    }

    /// Cancel a loading tile. See [`RequestManager::cancel`].
    pub fn cancel(&self, tile: &TileDescriptor) -> bool {
        self.requests.cancel(tile)
    }
}
