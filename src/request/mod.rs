//! Tile request lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        RequestManager                           │
//! │  dispatch(tile)                                                 │
//! │    1. HeaderResolver::resolve  (freeze headers on the tile)     │
//! │    2. Queued -> Loading        (store request handle)           │
//! │    3. spawn fetch task ──────────────┐                          │
//! │  cancel(tile)                        │                          │
//! │    Loading -> Cancelled, abort task  │                          │
//! └──────────────────────────────────────┼──────────────────────────┘
//!                                        ▼
//!                      ┌─────────────────────────────────┐
//!                      │   TileTransport (HttpTransport) │
//!                      └────────────────┬────────────────┘
//!                                       ▼
//!                      ┌─────────────────────────────────┐
//!                      │ EventSink: tile-loaded /        │
//!                      │            tile-load-failed     │
//!                      └─────────────────────────────────┘
//! ```
//!
//! Fetch outcomes are never returned as errors from these operations: they
//! arrive as [`TileEvent`]s. Only misuse (dispatching a tile that is not
//! queued) is reported synchronously.

mod events;
mod handle;
mod http_transport;
mod manager;
mod transport;

pub use events::{BroadcastEvents, EventSink, TileEvent, DEFAULT_EVENT_CAPACITY};
pub use handle::{ReadyState, TileRequestHandle};
pub use http_transport::HttpTransport;
pub use manager::RequestManager;
pub use transport::{TileTransport, TransportRequest, TransportResponse};

#[cfg(test)]
pub(crate) use transport::MockTransport;
