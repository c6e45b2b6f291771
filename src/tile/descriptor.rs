use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::LifecycleError;
use crate::request::{ReadyState, TileRequestHandle};
use crate::resolver::ResolvedHeaders;
use crate::scope::Headers;
use crate::viewer::TiledImage;

static NEXT_TILE_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Tile State
// =============================================================================

/// Lifecycle state of one tile request attempt.
///
/// ```text
/// Queued ──dispatch──▶ Loading ──success──▶ Loaded
///                         ├─────failure──▶ Failed
///                         └─────cancel───▶ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    Queued,
    Loading,
    Loaded,
    Failed,
    Cancelled,
}

impl TileState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed | Self::Cancelled)
    }
}

// =============================================================================
// Tile Descriptor
// =============================================================================

struct Lifecycle {
    state: TileState,
    request: Option<TileRequestHandle>,
    cancel: Option<CancellationToken>,
}

struct TileInner {
    id: u64,
    attempt: u32,
    level: usize,
    column: usize,
    row: usize,
    url: String,
    image: Arc<TiledImage>,
    overrides: Option<Headers>,
    resolved: OnceLock<ResolvedHeaders>,
    lifecycle: Mutex<Lifecycle>,
}

/// One tile request attempt.
///
/// Cloning is cheap and every clone refers to the same attempt: the
/// discovery process, the request task and emitted events all observe the
/// same state.
#[derive(Clone)]
pub struct TileDescriptor {
    inner: Arc<TileInner>,
}

impl TileDescriptor {
    /// Create a queued descriptor.
    ///
    /// Most callers go through [`TiledImage::create_tile`], which asks the
    /// image's tile source for `url` and `overrides`.
    pub fn new(
        image: Arc<TiledImage>,
        level: usize,
        column: usize,
        row: usize,
        url: impl Into<String>,
        overrides: Option<Headers>,
    ) -> Self {
        Self::build(
            NEXT_TILE_ID.fetch_add(1, Ordering::Relaxed),
            1,
            image,
            level,
            column,
            row,
            url.into(),
            overrides,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        id: u64,
        attempt: u32,
        image: Arc<TiledImage>,
        level: usize,
        column: usize,
        row: usize,
        url: String,
        overrides: Option<Headers>,
    ) -> Self {
        Self {
            inner: Arc::new(TileInner {
                id,
                attempt,
                level,
                column,
                row,
                url,
                image,
                overrides,
                resolved: OnceLock::new(),
                lifecycle: Mutex::new(Lifecycle {
                    state: TileState::Queued,
                    request: None,
                    cancel: None,
                }),
            }),
        }
    }

    /// A fresh queued attempt for the same tile.
    ///
    /// Keeps the tile identity, URL and overrides; headers are resolved
    /// again when the new attempt is dispatched.
    pub fn retry(&self) -> Self {
        let inner = &self.inner;
        Self::build(
            inner.id,
            inner.attempt + 1,
            Arc::clone(&inner.image),
            inner.level,
            inner.column,
            inner.row,
            inner.url.clone(),
            inner.overrides.clone(),
        )
    }

    /// Tile identity, shared by all attempts created through [`retry`](Self::retry).
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.inner.attempt
    }

    pub fn level(&self) -> usize {
        self.inner.level
    }

    pub fn column(&self) -> usize {
        self.inner.column
    }

    pub fn row(&self) -> usize {
        self.inner.row
    }

    /// URL the tile is fetched from.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Image whose scope participates in header resolution.
    pub fn image(&self) -> &Arc<TiledImage> {
        &self.inner.image
    }

    /// Headers supplied by the tile source.
    pub fn overrides(&self) -> Option<&Headers> {
        self.inner.overrides.as_ref()
    }

    /// Headers frozen at dispatch, `None` before dispatch.
    pub fn resolved_headers(&self) -> Option<&ResolvedHeaders> {
        self.inner.resolved.get()
    }

    /// Shorthand for the frozen header map.
    pub fn ajax_headers(&self) -> Option<&Headers> {
        self.resolved_headers().map(ResolvedHeaders::headers)
    }

    pub fn state(&self) -> TileState {
        self.inner.lifecycle.lock().state
    }

    /// Request handle, present from dispatch onwards.
    pub fn request(&self) -> Option<TileRequestHandle> {
        self.inner.lifecycle.lock().request.clone()
    }

    /// Whether both handles refer to the same attempt.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Transitions (driven by the request manager)
    // -------------------------------------------------------------------------

    /// `Queued -> Loading`, freezing the resolved headers.
    pub(crate) fn begin(
        &self,
        resolved: ResolvedHeaders,
        request: TileRequestHandle,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != TileState::Queued {
            return Err(LifecycleError::NotQueued {
                state: lifecycle.state,
            });
        }

        // A queued attempt has never been dispatched, so the cell is empty.
        let _ = self.inner.resolved.set(resolved);
        lifecycle.state = TileState::Loading;
        lifecycle.request = Some(request);
        lifecycle.cancel = Some(cancel);
        Ok(())
    }

    /// `Loading -> Loaded | Failed`.
    ///
    /// Returns the final request handle, or `None` when the tile already
    /// left `Loading` (a late completion after cancellation).
    pub(crate) fn finish(
        &self,
        outcome: TileState,
        update: impl FnOnce(&mut TileRequestHandle),
    ) -> Option<TileRequestHandle> {
        debug_assert!(matches!(outcome, TileState::Loaded | TileState::Failed));

        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != TileState::Loading {
            return None;
        }

        let request = lifecycle.request.as_mut()?;
        update(request);
        request.ready_state = ReadyState::Done;
        let request = request.clone();

        lifecycle.state = outcome;
        lifecycle.cancel = None;
        Some(request)
    }

    /// `Loading -> Cancelled`. Returns whether this call made the transition.
    pub(crate) fn abort(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != TileState::Loading {
            return false;
        }

        if let Some(token) = lifecycle.cancel.take() {
            token.cancel();
        }
        if let Some(request) = lifecycle.request.as_mut() {
            request.aborted = true;
            request.ready_state = ReadyState::Done;
        }
        lifecycle.state = TileState::Cancelled;
        true
    }
}

impl PartialEq for TileDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TileDescriptor {}

impl std::fmt::Debug for TileDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileDescriptor")
            .field("id", &self.inner.id)
            .field("attempt", &self.inner.attempt)
            .field("level", &self.inner.level)
            .field("column", &self.inner.column)
            .field("row", &self.inner.row)
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}
