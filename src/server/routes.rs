//! Router configuration for the packed-resource server.
//!
//! # Route Structure
//!
//! ```text
//! /health              - Health check
//! /packed/{*name}      - Packed resource, byte ranges supported
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pyramid_fetch::server::{create_router, RouterConfig};
//!
//! # async fn run() -> std::io::Result<()> {
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//! let router = create_router("/srv/pyramids", config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, packed_handler, AppState};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with defaults.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router serving packed resources from `root`.
pub fn create_router(root: impl Into<PathBuf>, config: RouterConfig) -> Router {
    let app_state = AppState::new(root).with_cache_max_age(config.cache_max_age);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/packed/{*name}", get(packed_handler))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
///
/// Tile requests carry arbitrary custom headers, so any request header is
/// allowed. Range response headers are exposed to scripts.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([CONTENT_RANGE, ACCEPT_RANGES, CONTENT_LENGTH])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
