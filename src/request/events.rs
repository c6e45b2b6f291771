use std::future::Future;
use std::ops::ControlFlow;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use super::handle::TileRequestHandle;
use crate::error::TransportError;
use crate::tile::{TileDescriptor, TileState};

/// Default buffer size of the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Outward notification of a tile request's outcome.
///
/// Cancelled tiles produce no event.
#[derive(Debug, Clone)]
pub enum TileEvent {
    /// `tile-loaded`: the response had a 2xx status
    Loaded {
        tile: TileDescriptor,
        request: TileRequestHandle,
    },

    /// `tile-load-failed`: non-2xx status, network error or timeout
    LoadFailed {
        tile: TileDescriptor,
        request: TileRequestHandle,
        error: TransportError,
    },
}

impl TileEvent {
    /// Event name as seen by the rest of the viewer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loaded { .. } => "tile-loaded",
            Self::LoadFailed { .. } => "tile-load-failed",
        }
    }

    pub fn tile(&self) -> &TileDescriptor {
        match self {
            Self::Loaded { tile, .. } | Self::LoadFailed { tile, .. } => tile,
        }
    }

    pub fn request(&self) -> &TileRequestHandle {
        match self {
            Self::Loaded { request, .. } | Self::LoadFailed { request, .. } => request,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Event bus seam the request manager reports outcomes through.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TileEvent);
}

/// Broadcast-channel event bus with one-shot subscriptions.
///
/// Events emitted while nobody listens are dropped.
pub struct BroadcastEvents {
    sender: broadcast::Sender<TileEvent>,
}

impl BroadcastEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Long-lived subscription. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.sender.subscribe()
    }

    /// Resolve with the first event matching `predicate`.
    ///
    /// The subscription is taken when this is called, not when the future is
    /// first polled, so events emitted in between are not missed. Resolves
    /// to `None` if the bus is dropped first, or if the subscriber lagged and
    /// a matching event may have been dropped.
    pub fn next_matching<F>(
        &self,
        predicate: F,
    ) -> impl Future<Output = Option<TileEvent>> + Send + 'static
    where
        F: FnMut(&TileEvent) -> bool + Send + 'static,
    {
        self.next_or_recover(predicate, || ControlFlow::Break(None))
    }

    /// Next `tile-loaded` event.
    pub fn next_loaded(&self) -> impl Future<Output = Option<TileEvent>> + Send + 'static {
        self.next_matching(TileEvent::is_loaded)
    }

    /// Next `tile-load-failed` event.
    pub fn next_failed(&self) -> impl Future<Output = Option<TileEvent>> + Send + 'static {
        self.next_matching(|event| !event.is_loaded())
    }

    /// Next event of either kind for `tile`.
    ///
    /// If the subscriber lags and the tile already completed, the event is
    /// rebuilt from the tile's request handle. Resolves to `None` if the
    /// tile was cancelled.
    pub fn next_for(
        &self,
        tile: &TileDescriptor,
    ) -> impl Future<Output = Option<TileEvent>> + Send + 'static {
        let target = tile.clone();
        let tile = tile.clone();
        self.next_or_recover(
            move |event| event.tile().ptr_eq(&target),
            move || match tile.state() {
                TileState::Queued | TileState::Loading => ControlFlow::Continue(()),
                TileState::Cancelled => ControlFlow::Break(None),
                TileState::Loaded | TileState::Failed => ControlFlow::Break(completed(&tile)),
            },
        )
    }

    /// Wait for a matching event. After a lag, `on_lag` decides whether to
    /// resolve with its value or keep waiting.
    fn next_or_recover<F, R>(
        &self,
        mut predicate: F,
        mut on_lag: R,
    ) -> impl Future<Output = Option<TileEvent>> + Send + 'static
    where
        F: FnMut(&TileEvent) -> bool + Send + 'static,
        R: FnMut() -> ControlFlow<Option<TileEvent>> + Send + 'static,
    {
        let mut receiver = self.sender.subscribe();
        async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if predicate(&event) => return Some(event),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event subscriber lagged, events dropped");
                        if let ControlFlow::Break(outcome) = on_lag() {
                            return outcome;
                        }
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    }
}

/// Rebuild the outcome event of a tile that already completed.
fn completed(tile: &TileDescriptor) -> Option<TileEvent> {
    let request = tile.request()?;
    let event = match tile.state() {
        TileState::Loaded => TileEvent::Loaded {
            tile: tile.clone(),
            request,
        },
        TileState::Failed => {
            let error = request.error.clone()?;
            TileEvent::LoadFailed {
                tile: tile.clone(),
                request,
                error,
            }
        }
        _ => return None,
    };
    Some(event)
}

impl Default for BroadcastEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSink for BroadcastEvents {
    fn emit(&self, event: TileEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}
