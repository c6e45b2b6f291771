use std::sync::Arc;

use tracing::debug;

use crate::error::AddressingError;
use crate::scope::{ConfigScope, Headers};
use crate::source::TileSource;
use crate::tile::TileDescriptor;

/// Options for adding a tiled image to a viewer.
#[derive(Clone)]
pub struct TiledImageOptions {
    /// Where tiles come from
    pub source: Arc<dyn TileSource>,

    /// Image-scope headers
    pub ajax_headers: Option<Headers>,

    /// Image-scope credentials flag; `None` follows the viewer
    pub ajax_with_credentials: Option<bool>,
}

impl TiledImageOptions {
    pub fn new(source: Arc<dyn TileSource>) -> Self {
        Self {
            source,
            ajax_headers: None,
            ajax_with_credentials: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.ajax_headers = Some(headers);
        self
    }

    pub fn with_credentials(mut self, flag: bool) -> Self {
        self.ajax_with_credentials = Some(flag);
        self
    }
}

/// One image in a viewer, owner of the image-level configuration scope.
pub struct TiledImage {
    viewer_scope: Arc<ConfigScope>,
    scope: ConfigScope,
    source: Arc<dyn TileSource>,
}

impl TiledImage {
    /// Attach an image to a viewer scope.
    pub fn new(viewer_scope: Arc<ConfigScope>, options: TiledImageOptions) -> Arc<Self> {
        Arc::new(Self {
            viewer_scope,
            scope: ConfigScope::new(
                options.ajax_headers.unwrap_or_default(),
                options.ajax_with_credentials,
            ),
            source: options.source,
        })
    }

    /// Replace this image's own headers.
    ///
    /// With `propagate`, tiles dispatched from now on resolve against the new
    /// value. Without it they keep resolving against the previously
    /// published one.
    pub fn set_ajax_headers(&self, headers: Option<Headers>, propagate: bool) {
        self.scope.set_headers(headers, propagate);
    }

    /// Set this image's credentials flag, overriding the viewer's.
    pub fn set_ajax_with_credentials(&self, flag: bool) {
        self.scope.set_credentials(flag);
    }

    /// Headers set on this image, without the viewer's.
    pub fn own_headers(&self) -> Headers {
        self.scope.snapshot().headers().clone()
    }

    /// Effective image headers: viewer headers as last propagated, overlaid
    /// with this image's own current headers.
    pub fn ajax_headers(&self) -> Headers {
        let mut headers = self.viewer_scope.published().headers().clone();
        headers.extend(self.own_headers());
        headers
    }

    /// Effective credentials flag.
    pub fn ajax_with_credentials(&self) -> bool {
        self.scope
            .snapshot()
            .credentials()
            .or(self.viewer_scope.published().credentials())
            .unwrap_or(false)
    }

    pub fn scope(&self) -> &ConfigScope {
        &self.scope
    }

    pub fn viewer_scope(&self) -> &ConfigScope {
        &self.viewer_scope
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    /// Create a queued descriptor for `(level, column, row)`.
    ///
    /// # Errors
    ///
    /// Fails synchronously when the tile source cannot address the tile.
    pub fn create_tile(
        self: &Arc<Self>,
        level: usize,
        column: usize,
        row: usize,
    ) -> Result<TileDescriptor, AddressingError> {
        let overrides = self.source.tile_headers(level, column, row)?;
        let url = self.source.tile_url(level, column, row);
        debug!(level, column, row, url = %url, "Created tile descriptor");
        Ok(TileDescriptor::new(
            Arc::clone(self),
            level,
            column,
            row,
            url,
            overrides,
        ))
    }
}

impl std::fmt::Debug for TiledImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiledImage")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
