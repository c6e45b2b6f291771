//! Per-tile header resolution.
//!
//! Precedence, lowest to highest; each layer overwrites same-named keys of
//! the one below:
//!
//! 1. Viewer scope (published value)
//! 2. Image scope (published value)
//! 3. Tile-source overrides, including the byte-range header of packed sources
//!
//! Credentials are resolved separately: the image flag if it has one,
//! otherwise the viewer flag. There is no tile-level credentials override.

use std::sync::Arc;

use crate::scope::{Headers, ScopeSnapshot};
use crate::tile::TileDescriptor;

/// Frozen outcome of header resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeaders {
    headers: Arc<Headers>,
    with_credentials: bool,
}

impl ResolvedHeaders {
    /// Merged header map.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Shared handle to the merged header map.
    pub fn shared_headers(&self) -> Arc<Headers> {
        Arc::clone(&self.headers)
    }

    /// Whether the transport should include ambient credentials.
    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }
}

/// Combines the three configuration layers into one snapshot.
///
/// Resolution never caches: each call reads the scopes as they are at that
/// moment.
pub struct HeaderResolver;

impl HeaderResolver {
    /// Merge explicit snapshots.
    pub fn merge(
        viewer: &ScopeSnapshot,
        image: &ScopeSnapshot,
        overrides: Option<&Headers>,
    ) -> ResolvedHeaders {
        let mut headers = viewer.headers().clone();
        headers.extend(
            image
                .headers()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if let Some(overrides) = overrides {
            headers.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let with_credentials = image
            .credentials()
            .or(viewer.credentials())
            .unwrap_or(false);

        ResolvedHeaders {
            headers: Arc::new(headers),
            with_credentials,
        }
    }

    /// Resolve against the tile's image and viewer scopes as they are now.
    pub fn resolve(tile: &TileDescriptor) -> ResolvedHeaders {
        let image = tile.image();
        Self::merge(
            &image.viewer_scope().published(),
            &image.scope().published(),
            tile.overrides(),
        )
    }
}
