use thiserror::Error;

use crate::tile::TileState;

/// Errors raised when a pyramid coordinate cannot be mapped to a byte range.
///
/// These are synchronous and deterministic: they are reported to whoever
/// asked for the address and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressingError {
    /// Level index is beyond the manifest's level count
    #[error("Level out of bounds: level {level}, manifest has {levels} levels")]
    LevelOutOfBounds { level: usize, levels: usize },

    /// Column index is beyond the level's column count
    #[error("Column out of bounds: column {column} at level {level}, level has {columns} columns")]
    ColumnOutOfBounds {
        level: usize,
        column: usize,
        columns: usize,
    },

    /// Row index is beyond the column's row count
    #[error("Row out of bounds: row {row} at level {level} column {column}, column has {rows} rows")]
    RowOutOfBounds {
        level: usize,
        column: usize,
        row: usize,
        rows: usize,
    },
}

/// Errors detected while loading a pyramid manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("I/O error reading manifest: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest is not valid JSON or has the wrong shape
    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A range has its start after its end
    #[error("Inverted range at ({level}, {column}, {row}): start {start} > end {end}")]
    InvertedRange {
        level: usize,
        column: usize,
        row: usize,
        start: u64,
        end: u64,
    },

    /// A range extends past the end of the packed resource
    #[error("Range at ({level}, {column}, {row}) ends at {end}, beyond total size {total_size}")]
    RangeBeyondTotal {
        level: usize,
        column: usize,
        row: usize,
        end: u64,
        total_size: u64,
    },

    /// Two ranges within one level share bytes
    #[error("Overlapping ranges at level {level}: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlap {
        level: usize,
        first_start: u64,
        first_end: u64,
        second_start: u64,
        second_end: u64,
    },

    /// The largest range end does not reach the declared total size
    #[error("Total size mismatch: declared {declared}, ranges end at {actual}")]
    TotalSizeMismatch { declared: u64, actual: u64 },
}

/// Transport-level outcomes of a tile fetch.
///
/// All variants surface uniformly as a failed tile; the variant is kept on
/// the request handle so callers can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },
}

/// Errors returned synchronously by the request lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Dispatch requires a tile in the `Queued` state
    #[error("Tile is not queued (state: {state:?})")]
    NotQueued { state: TileState },

    /// Dispatch was called outside a Tokio runtime
    #[error("No Tokio runtime available to run the tile request")]
    NoRuntime,
}

/// Errors raised by the packed-resource server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Requested resource does not exist under the served root
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource name escapes the served root or is otherwise malformed
    #[error("Invalid resource name: {0}")]
    InvalidName(String),

    /// Range header could not be parsed
    #[error("Malformed range header: {0}")]
    MalformedRange(String),

    /// Range is outside the resource or its declared total does not match
    #[error("Range not satisfiable: {reason}")]
    RangeNotSatisfiable { reason: String, size: u64 },

    /// File system error while reading the resource
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
