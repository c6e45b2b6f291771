use std::sync::Arc;

use bytes::Bytes;

use crate::error::TransportError;
use crate::resolver::ResolvedHeaders;
use crate::scope::Headers;

/// Progress of a request, mirroring the classic XHR ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    Done,
}

/// Inspectable record of one tile request.
///
/// Stored on the tile while it loads and handed to the outcome event once
/// the request is done. It keeps enough detail (status, error, abort flag)
/// to tell failure kinds apart.
#[derive(Debug, Clone)]
pub struct TileRequestHandle {
    /// Always `GET` for tiles
    pub method: http::Method,

    /// Request target
    pub url: String,

    /// Headers sent with the request (the tile's frozen snapshot)
    pub headers: Arc<Headers>,

    /// Whether ambient credentials were included
    pub with_credentials: bool,

    /// Current ready state
    pub ready_state: ReadyState,

    /// HTTP status, once a response arrived
    pub status: Option<u16>,

    /// Response body of a completed request
    pub body: Option<Bytes>,

    /// Transport outcome of a failed request
    pub error: Option<TransportError>,

    /// Set when the request was cancelled
    pub aborted: bool,
}

impl TileRequestHandle {
    /// A freshly opened GET request carrying `resolved` headers.
    pub fn opened(url: impl Into<String>, resolved: &ResolvedHeaders) -> Self {
        Self {
            method: http::Method::GET,
            url: url.into(),
            headers: resolved.shared_headers(),
            with_credentials: resolved.with_credentials(),
            ready_state: ReadyState::Opened,
            status: None,
            body: None,
            error: None,
            aborted: false,
        }
    }

    /// Whether the request finished with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.ready_state == ReadyState::Done
            && self.status.is_some_and(|status| (200..300).contains(&status))
    }
}
