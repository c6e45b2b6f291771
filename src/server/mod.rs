//! HTTP server for packed pyramid resources.
//!
//! Serves a directory of packed files and answers the `bytes=<s>-<e>/<t>`
//! ranges emitted by [`PackedTileSource`](crate::source::PackedTileSource)
//! as well as ordinary RFC 7233 ranges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                  GET /packed/{name}  + Range                    │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    range    │  │        routes           │  │
//! │  │ (requests)  │  │  (parsing)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod range;
pub mod routes;

pub use handlers::{health_handler, packed_handler, AppState, ErrorResponse, HealthResponse};
pub use range::RangeRequest;
pub use routes::{create_router, RouterConfig};
