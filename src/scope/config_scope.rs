use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::Headers;

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of a scope at one generation.
///
/// Holding a snapshot does not keep it current: the owning scope may have
/// moved on since it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSnapshot {
    headers: Arc<Headers>,
    credentials: Option<bool>,
    generation: u64,
}

impl ScopeSnapshot {
    /// Header mapping at this generation.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Credentials flag, `None` when the scope inherits from its parent.
    pub fn credentials(&self) -> Option<bool> {
        self.credentials
    }

    /// Generation counter this snapshot was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// =============================================================================
// Config Scope
// =============================================================================

struct ScopeState {
    current: ScopeSnapshot,
    published: ScopeSnapshot,
}

/// Mutable header/credential holder owned by a viewer or a tiled image.
///
/// Every write swaps a whole snapshot under the lock, so readers never see a
/// partially updated mapping.
pub struct ConfigScope {
    state: RwLock<ScopeState>,
}

impl ConfigScope {
    /// Create a scope whose current and published values start equal.
    pub fn new(headers: Headers, credentials: Option<bool>) -> Self {
        let snapshot = ScopeSnapshot {
            headers: Arc::new(headers),
            credentials,
            generation: 0,
        };
        Self {
            state: RwLock::new(ScopeState {
                current: snapshot.clone(),
                published: snapshot,
            }),
        }
    }

    /// Replace the header mapping wholesale.
    ///
    /// `None` or an empty map clears the scope. The generation is always
    /// bumped. With `propagate` the new value is also published to
    /// dependents; already dispatched tiles are never affected.
    ///
    /// Returns the new generation.
    pub fn set_headers(&self, headers: Option<Headers>, propagate: bool) -> u64 {
        let headers = Arc::new(headers.unwrap_or_default());
        let mut state = self.state.write();
        let generation = state.current.generation + 1;

        state.current = ScopeSnapshot {
            headers,
            credentials: state.current.credentials,
            generation,
        };
        if propagate {
            state.published = state.current.clone();
        }

        debug!(
            generation,
            propagate,
            header_count = state.current.headers.len(),
            "Scope headers replaced"
        );
        generation
    }

    /// Replace the credentials flag.
    ///
    /// Credentials have no propagate switch: dependents see the new flag on
    /// their next dispatch.
    pub fn set_credentials(&self, flag: bool) -> u64 {
        let mut state = self.state.write();
        let generation = state.current.generation + 1;

        state.current.credentials = Some(flag);
        state.current.generation = generation;
        state.published.credentials = Some(flag);
        state.published.generation = generation;

        debug!(generation, credentials = flag, "Scope credentials replaced");
        generation
    }

    /// Publish the current value to dependents.
    pub fn publish(&self) {
        let mut state = self.state.write();
        state.published = state.current.clone();
    }

    /// The value the owner last wrote.
    pub fn snapshot(&self) -> ScopeSnapshot {
        self.state.read().current.clone()
    }

    /// The value dependents resolve against.
    pub fn published(&self) -> ScopeSnapshot {
        self.state.read().published.clone()
    }

    /// Current generation counter.
    pub fn generation(&self) -> u64 {
        self.state.read().current.generation
    }
}

impl Default for ConfigScope {
    fn default() -> Self {
        Self::new(Headers::new(), None)
    }
}

impl std::fmt::Debug for ConfigScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConfigScope")
            .field("current", &state.current)
            .field("published", &state.published)
            .finish()
    }
}
