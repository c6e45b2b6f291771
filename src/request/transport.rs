use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::scope::Headers;

/// What the transport is asked to fetch.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Request target
    pub url: String,

    /// Headers attached verbatim
    pub headers: Arc<Headers>,

    /// Whether to include ambient credentials (cookies, auth)
    pub with_credentials: bool,
}

/// A response of any status.
///
/// Non-2xx statuses are not transport errors; the request manager decides
/// what counts as success.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Network seam for tile fetches.
///
/// Implementations must be thread-safe; the manager shares one transport
/// across all request tasks. Dropping the returned future must abort the
/// underlying request.
#[async_trait]
pub trait TileTransport: Send + Sync {
    /// Issue a GET for `request`.
    ///
    /// Returns an error only when no response was obtained.
    async fn fetch(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
pub(crate) use mock::MockTransport;
