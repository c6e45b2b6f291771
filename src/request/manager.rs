use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::{EventSink, TileEvent};
use super::handle::TileRequestHandle;
use super::transport::{TileTransport, TransportRequest, TransportResponse};
use crate::error::{LifecycleError, TransportError};
use crate::resolver::HeaderResolver;
use crate::tile::{TileDescriptor, TileState};

/// Issues tile fetches and reports their outcome.
///
/// The manager imposes no bound on the number of tiles in flight; an
/// external scheduling policy decides when to call [`dispatch`](Self::dispatch)
/// and can read [`in_flight`](Self::in_flight) to do so.
///
/// # Example
///
/// ```ignore
/// let manager = RequestManager::new(transport, events.clone())
///     .with_timeout(Duration::from_secs(30));
///
/// let done = events.next_for(&tile);
/// manager.dispatch(&tile)?;
/// match done.await {
///     Some(TileEvent::Loaded { request, .. }) => draw(request.body),
///     Some(TileEvent::LoadFailed { error, .. }) => schedule_retry(tile.retry(), error),
///     None => {}
/// }
/// ```
pub struct RequestManager {
    transport: Arc<dyn TileTransport>,
    events: Arc<dyn EventSink>,
    timeout: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
}

impl RequestManager {
    /// Create a manager with no request timeout.
    pub fn new(transport: Arc<dyn TileTransport>, events: Arc<dyn EventSink>) -> Self {
        Self {
            transport,
            events,
            timeout: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Number of tiles currently `Loading`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start fetching a queued tile.
    ///
    /// Resolves and freezes the tile's headers, moves it to `Loading` and
    /// spawns the fetch. The outcome is reported through the event sink.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotQueued`] when the tile was already dispatched.
    /// Terminal tiles are never re-dispatched; use
    /// [`TileDescriptor::retry`] for a new attempt.
    ///
    /// [`LifecycleError::NoRuntime`] when called outside a Tokio runtime. The
    /// tile stays `Queued`.
    pub fn dispatch(&self, tile: &TileDescriptor) -> Result<(), LifecycleError> {
        let state = tile.state();
        if state != TileState::Queued {
            return Err(LifecycleError::NotQueued { state });
        }
        let runtime = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;

        let resolved = HeaderResolver::resolve(tile);
        let request = TransportRequest {
            url: tile.url().to_string(),
            headers: resolved.shared_headers(),
            with_credentials: resolved.with_credentials(),
        };
        let handle = TileRequestHandle::opened(tile.url(), &resolved);
        let cancel = CancellationToken::new();

        tile.begin(resolved, handle, cancel.clone())?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        debug!(
            tile_id = tile.id(),
            attempt = tile.attempt(),
            level = tile.level(),
            column = tile.column(),
            row = tile.row(),
            url = %request.url,
            with_credentials = request.with_credentials,
            "Tile loading"
        );

        let transport = Arc::clone(&self.transport);
        let events = Arc::clone(&self.events);
        let in_flight = Arc::clone(&self.in_flight);
        let timeout = self.timeout;
        let tile = tile.clone();

        runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = fetch(transport.as_ref(), request, timeout) => result,
            };

            if complete(&tile, result, events.as_ref()) {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        });

        Ok(())
    }

    /// Cancel a loading tile.
    ///
    /// Aborts the transport and moves the tile to `Cancelled` without
    /// emitting an event. A completion that races with the cancellation is
    /// discarded. Returns `false` (and does nothing) when the tile is not
    /// `Loading`, so repeated calls are harmless.
    pub fn cancel(&self, tile: &TileDescriptor) -> bool {
        if !tile.abort() {
            return false;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        debug!(tile_id = tile.id(), attempt = tile.attempt(), "Tile cancelled");
        true
    }
}

async fn fetch(
    transport: &dyn TileTransport,
    request: TransportRequest,
    timeout: Option<Duration>,
) -> Result<TransportResponse, TransportError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, transport.fetch(request))
            .await
            .unwrap_or(Err(TransportError::Timeout {
                millis: limit.as_millis() as u64,
            })),
        None => transport.fetch(request).await,
    }
}

/// Apply a transport outcome. Returns whether the tile transitioned.
fn complete(
    tile: &TileDescriptor,
    result: Result<TransportResponse, TransportError>,
    events: &dyn EventSink,
) -> bool {
    let (outcome, status, body, error) = match result {
        Ok(response) if (200..300).contains(&response.status) => {
            (TileState::Loaded, Some(response.status), Some(response.body), None)
        }
        Ok(response) => (
            TileState::Failed,
            Some(response.status),
            Some(response.body),
            Some(TransportError::Http {
                status: response.status,
            }),
        ),
        Err(error) => (TileState::Failed, None, None, Some(error)),
    };

    let recorded = error.clone();
    let Some(request) = tile.finish(outcome, |handle| {
        handle.status = status;
        handle.body = body;
        handle.error = recorded;
    }) else {
        debug!(
            tile_id = tile.id(),
            "Discarding completion for tile that is no longer loading"
        );
        return false;
    };

    let event = match error {
        None => {
            debug!(tile_id = tile.id(), status = ?request.status, "Tile loaded");
            TileEvent::Loaded {
                tile: tile.clone(),
                request,
            }
        }
        Some(error) => {
            warn!(tile_id = tile.id(), url = %tile.url(), error = %error, "Tile load failed");
            TileEvent::LoadFailed {
                tile: tile.clone(),
                request,
                error,
            }
        }
    };
    events.emit(event);
    true
}
