//! `Range` header handling for packed resources.
//!
//! Two forms are accepted:
//!
//! - `bytes=<start>-<end>/<total>`: the tile form emitted by packed tile
//!   sources. `end` is exclusive and `total` must equal the resource size.
//! - `bytes=<start>-<end>` / `bytes=<start>-`: the RFC 7233 form, with an
//!   inclusive `end`.

use crate::error::ServeError;
use crate::manifest::ByteRange;

/// A parsed `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// Half-open tile range with declared total size
    Packed(ByteRange),

    /// Inclusive RFC range; `end = None` means "to the end"
    Inclusive { start: u64, end: Option<u64> },
}

impl RangeRequest {
    /// Parse a header value.
    pub fn parse(value: &str) -> Result<Self, ServeError> {
        if let Some(range) = ByteRange::parse(value) {
            return Ok(Self::Packed(range));
        }

        let malformed = || ServeError::MalformedRange(value.to_string());
        let spec = value.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
        if spec.contains(',') || spec.contains('/') {
            return Err(malformed());
        }

        let (start, end) = spec.split_once('-').ok_or_else(malformed)?;
        let start = start.trim().parse().map_err(|_| malformed())?;
        let end = match end.trim() {
            "" => None,
            end => Some(end.parse().map_err(|_| malformed())?),
        };

        Ok(Self::Inclusive { start, end })
    }

    /// Half-open `[start, end)` span within a resource of `size` bytes.
    pub fn resolve(&self, size: u64) -> Result<(u64, u64), ServeError> {
        let unsatisfiable = |reason: String| ServeError::RangeNotSatisfiable { reason, size };

        match *self {
            Self::Packed(range) => {
                if range.total_size != size {
                    return Err(unsatisfiable(format!(
                        "declared total {} does not match resource size {}",
                        range.total_size, size
                    )));
                }
                if range.start >= range.end || range.end > size {
                    return Err(unsatisfiable(format!(
                        "range {}-{} is empty or outside the resource",
                        range.start, range.end
                    )));
                }
                Ok((range.start, range.end))
            }
            Self::Inclusive { start, end } => {
                let last = end.unwrap_or(u64::MAX).min(size.saturating_sub(1));
                if start >= size || start > last {
                    return Err(unsatisfiable(format!(
                        "range starting at {} is outside the resource",
                        start
                    )));
                }
                Ok((start, last + 1))
            }
        }
    }
}
