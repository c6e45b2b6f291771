use std::fmt;

use super::PyramidManifest;
use crate::error::AddressingError;

/// Header name carrying the tile's byte range.
pub const RANGE_HEADER: &str = "Range";

/// Location of one tile inside a packed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte of the tile
    pub start: u64,

    /// End of the tile (exclusive)
    pub end: u64,

    /// Total byte length of the packed resource
    pub total_size: u64,
}

impl ByteRange {
    /// Create a byte range.
    pub fn new(start: u64, end: u64, total_size: u64) -> Self {
        Self {
            start,
            end,
            total_size,
        }
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Partial-content header value: `bytes=<start>-<end>/<totalSize>`.
    pub fn header_value(&self) -> String {
        self.to_string()
    }

    /// Parse a `bytes=<start>-<end>/<totalSize>` value.
    ///
    /// Returns `None` for anything else, including the plain RFC 7233 form
    /// without a total.
    pub fn parse(value: &str) -> Option<Self> {
        let spec = value.trim().strip_prefix("bytes=")?;
        let (span, total) = spec.split_once('/')?;
        let (start, end) = span.split_once('-')?;

        Some(Self {
            start: start.trim().parse().ok()?,
            end: end.trim().parse().ok()?,
            total_size: total.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// Map a pyramid coordinate to its byte range.
///
/// # Errors
///
/// Returns [`AddressingError`] when `level`, `column` or `row` is outside the
/// manifest's bounds.
pub fn address_of(
    manifest: &PyramidManifest,
    level: usize,
    column: usize,
    row: usize,
) -> Result<ByteRange, AddressingError> {
    let columns = manifest
        .column_count(level)
        .ok_or(AddressingError::LevelOutOfBounds {
            level,
            levels: manifest.level_count(),
        })?;

    let rows = manifest
        .row_count(level, column)
        .ok_or(AddressingError::ColumnOutOfBounds {
            level,
            column,
            columns,
        })?;

    let [start, end] = manifest
        .raw_range(level, column, row)
        .ok_or(AddressingError::RowOutOfBounds {
            level,
            column,
            row,
            rows,
        })?;

    Ok(ByteRange::new(start, end, manifest.total_size()))
}
