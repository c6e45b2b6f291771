//! Pyramid manifests and tile addressing for packed resources.
//!
//! A packed resource is a single file holding every tile of a pyramid back to
//! back. Its manifest records where each tile lives:
//!
//! ```json
//! {
//!   "tileRanges": [ [ [ [0, 3467] ] ], [ [ [3467, 6954] ] ] ],
//!   "totalSize": 6954
//! }
//! ```
//!
//! `tileRanges[level][column][row]` is a half-open `[start, end)` byte range,
//! so consecutive tiles share a boundary value. Integrity is checked once when
//! the manifest is loaded; [`address_of`] trusts it afterwards.
//!
//! # Example
//!
//! ```
//! use pyramid_fetch::manifest::{address_of, PyramidManifest};
//!
//! let manifest = PyramidManifest::from_json(
//!     r#"{"tileRanges": [[[[0, 3467]]]], "totalSize": 3467}"#,
//! ).unwrap();
//!
//! let range = address_of(&manifest, 0, 0, 0).unwrap();
//! assert_eq!(range.header_value(), "bytes=0-3467/3467");
//! ```

mod address;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ManifestError;

pub use address::{address_of, ByteRange, RANGE_HEADER};

/// Byte-range table indexed by `[level][column][row]`.
pub type TileRanges = Vec<Vec<Vec<[u64; 2]>>>;

/// Immutable byte-range table for one packed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidManifest {
    tile_ranges: TileRanges,
    total_size: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    tile_ranges: TileRanges,
    total_size: u64,
}

impl PyramidManifest {
    /// Build a manifest, validating its integrity.
    ///
    /// # Errors
    ///
    /// Fails when a range is inverted, runs past `total_size`, overlaps
    /// another range of the same level, or when the largest range end is not
    /// exactly `total_size`.
    pub fn new(tile_ranges: TileRanges, total_size: u64) -> Result<Self, ManifestError> {
        validate(&tile_ranges, total_size)?;
        Ok(Self {
            tile_ranges,
            total_size,
        })
    }

    /// Parse and validate a manifest from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_str(json)?;
        Self::new(raw.tile_ranges, raw.total_size)
    }

    /// Read, parse and validate a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let manifest = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            levels = manifest.level_count(),
            total_size = manifest.total_size,
            "Loaded pyramid manifest"
        );
        Ok(manifest)
    }

    /// Total byte length of the packed resource.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Number of pyramid levels.
    pub fn level_count(&self) -> usize {
        self.tile_ranges.len()
    }

    /// Number of columns at `level`, or `None` if the level does not exist.
    pub fn column_count(&self, level: usize) -> Option<usize> {
        self.tile_ranges.get(level).map(Vec::len)
    }

    /// Number of rows in `column` at `level`.
    pub fn row_count(&self, level: usize, column: usize) -> Option<usize> {
        self.tile_ranges
            .get(level)
            .and_then(|columns| columns.get(column))
            .map(Vec::len)
    }

    /// Every `(column, row)` coordinate present at `level`, column-major.
    pub fn tiles_at(&self, level: usize) -> Vec<(usize, usize)> {
        self.tile_ranges
            .get(level)
            .map(|columns| {
                columns
                    .iter()
                    .enumerate()
                    .flat_map(|(column, rows)| (0..rows.len()).map(move |row| (column, row)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn raw_range(&self, level: usize, column: usize, row: usize) -> Option<[u64; 2]> {
        self.tile_ranges.get(level)?.get(column)?.get(row).copied()
    }
}

fn validate(tile_ranges: &TileRanges, total_size: u64) -> Result<(), ManifestError> {
    let mut max_end = 0u64;

    for (level, columns) in tile_ranges.iter().enumerate() {
        let mut ranges = Vec::new();

        for (column, rows) in columns.iter().enumerate() {
            for (row, &[start, end]) in rows.iter().enumerate() {
                if start > end {
                    return Err(ManifestError::InvertedRange {
                        level,
                        column,
                        row,
                        start,
                        end,
                    });
                }
                if end > total_size {
                    return Err(ManifestError::RangeBeyondTotal {
                        level,
                        column,
                        row,
                        end,
                        total_size,
                    });
                }
                max_end = max_end.max(end);
                ranges.push((start, end));
            }
        }

        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.1 > second.0 {
                return Err(ManifestError::Overlap {
                    level,
                    first_start: first.0,
                    first_end: first.1,
                    second_start: second.0,
                    second_end: second.1,
                });
            }
        }
    }

    if max_end != total_size {
        return Err(ManifestError::TotalSizeMismatch {
            declared: total_size,
            actual: max_end,
        });
    }

    Ok(())
}
