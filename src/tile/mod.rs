//! Tile descriptors and their request lifecycle state.
//!
//! A [`TileDescriptor`] is created by a tiled image for one grid position and
//! moves through [`TileState`] exactly once per attempt:
//!
//! ```text
//! Queued ──dispatch──▶ Loading ──2xx──────────▶ Loaded
//!    │                    ├──error / non-2xx──▶ Failed
//!    │                    └──cancel───────────▶ Cancelled
//!    └──cancel: no-op
//! ```

mod descriptor;

pub use descriptor::{TileDescriptor, TileState};
