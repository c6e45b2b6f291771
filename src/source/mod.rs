//! Tile sources: where a tile lives and which headers it needs.
//!
//! A tile source is consulted once per tile when the descriptor is created.
//! It provides the request URL and the tile-level header overrides, which sit
//! at the top of the header cascade.
//!
//! - [`PackedTileSource`]: every tile shares one URL; a per-tile `Range`
//!   header selects the tile's bytes inside the packed resource.
//! - [`TemplateTileSource`]: one URL per tile built from a template, with
//!   optional static headers.

mod packed;
mod template;

use crate::error::AddressingError;
use crate::scope::Headers;

pub use packed::PackedTileSource;
pub use template::TemplateTileSource;

/// Provider of tile URLs and per-tile header overrides.
///
/// Implementations must be thread-safe: descriptors keep an `Arc` of their
/// image, and through it the source, across async tasks.
pub trait TileSource: Send + Sync {
    /// URL to fetch the tile at `(level, column, row)` from.
    fn tile_url(&self, level: usize, column: usize, row: usize) -> String;

    /// Tile-level header overrides, or `None` when the source adds nothing.
    ///
    /// # Errors
    ///
    /// Sources backed by a manifest fail with [`AddressingError`] when the
    /// coordinate is outside the pyramid.
    fn tile_headers(
        &self,
        level: usize,
        column: usize,
        row: usize,
    ) -> Result<Option<Headers>, AddressingError>;
}
