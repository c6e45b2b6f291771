//! Header and credential configuration scopes.
//!
//! A [`ConfigScope`] is attached to exactly one owner: the viewer, or one
//! tiled image. Scopes form a three-level cascade with the per-tile
//! overrides supplied by the tile source:
//!
//! ```text
//! ┌──────────────┐   published    ┌──────────────┐   published    ┌──────────────┐
//! │ Viewer scope │ ─────────────▶ │ Image scope  │ ─────────────▶ │ Tile request │
//! └──────────────┘                └──────────────┘                └──────────────┘
//!                                                   + tile-source overrides
//! ```
//!
//! Each scope keeps two snapshots: the *current* value the owner last wrote,
//! and the *published* value its dependents resolve against. Writing with
//! `propagate = false` only moves the current snapshot.

mod config_scope;

use std::collections::BTreeMap;

pub use config_scope::{ConfigScope, ScopeSnapshot};

/// Header name to value mapping. Names are case-sensitive identities.
pub type Headers = BTreeMap<String, String>;

/// Build a [`Headers`] map from `(name, value)` pairs.
pub fn headers<I, K, V>(pairs: I) -> Headers
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
