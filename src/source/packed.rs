use std::sync::Arc;

use super::TileSource;
use crate::error::AddressingError;
use crate::manifest::{address_of, ByteRange, PyramidManifest, RANGE_HEADER};
use crate::scope::Headers;

/// Tile source for a single packed resource addressed by byte range.
///
/// The URL is the same for every tile; only the `Range` header changes.
/// Static headers given through [`with_headers`](Self::with_headers) are
/// emitted alongside it, and the range value always wins for its own key.
#[derive(Debug, Clone)]
pub struct PackedTileSource {
    url: String,
    manifest: Arc<PyramidManifest>,
    static_headers: Headers,
}

impl PackedTileSource {
    /// Create a source serving `manifest`'s tiles out of `url`.
    pub fn new(url: impl Into<String>, manifest: Arc<PyramidManifest>) -> Self {
        Self {
            url: url.into(),
            manifest,
            static_headers: Headers::new(),
        }
    }

    /// Add static headers sent with every tile.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.static_headers = headers;
        self
    }

    /// The manifest this source addresses tiles with.
    pub fn manifest(&self) -> &PyramidManifest {
        &self.manifest
    }

    /// Byte range of one tile.
    pub fn tile_range(
        &self,
        level: usize,
        column: usize,
        row: usize,
    ) -> Result<ByteRange, AddressingError> {
        address_of(&self.manifest, level, column, row)
    }
}

impl TileSource for PackedTileSource {
    fn tile_url(&self, _level: usize, _column: usize, _row: usize) -> String {
        self.url.clone()
    }

    fn tile_headers(
        &self,
        level: usize,
        column: usize,
        row: usize,
    ) -> Result<Option<Headers>, AddressingError> {
        let range = self.tile_range(level, column, row)?;
        let mut headers = self.static_headers.clone();
        headers.insert(RANGE_HEADER.to_string(), range.header_value());
        Ok(Some(headers))
    }
}
