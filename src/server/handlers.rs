//! HTTP request handlers for serving packed resources.
//!
//! # Endpoints
//!
//! - `GET /packed/{name}` - Serve a packed resource, honoring `Range`
//! - `GET /health` - Health check endpoint

use std::io::SeekFrom;
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, error, warn};

use super::range::RangeRequest;
use crate::error::ServeError;

// =============================================================================
// Application State
// =============================================================================

/// Shared state for the packed-resource handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory packed resources are served from
    pub root: Arc<PathBuf>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,
}

impl AppState {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            cache_max_age: 3600,
        }
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Map a resource name to a path under the root.
    fn resource_path(&self, name: &str) -> Result<PathBuf, ServeError> {
        let relative = FsPath::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(ServeError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "range_not_satisfiable")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ServeError to HTTP response.
///
/// 4xx errors are logged at WARN level (404 at DEBUG), 5xx at ERROR level.
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ServeError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServeError::InvalidName(_) => (StatusCode::BAD_REQUEST, "invalid_name"),
            ServeError::MalformedRange(_) => (StatusCode::BAD_REQUEST, "malformed_range"),
            ServeError::RangeNotSatisfiable { .. } => {
                (StatusCode::RANGE_NOT_SATISFIABLE, "range_not_satisfiable")
            }
            ServeError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(error_type, status = status.as_u16(), "Server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(error_type, status = status.as_u16(), "Resource not found: {}", message);
        } else {
            warn!(error_type, status = status.as_u16(), "Client error: {}", message);
        }

        let body = Json(ErrorResponse::with_status(error_type, message, status));
        match self {
            ServeError::RangeNotSatisfiable { size, .. } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve a packed resource.
///
/// # Endpoint
///
/// `GET /packed/{name}`
///
/// Without a `Range` header the whole resource is returned with `200 OK`.
/// With one, the selected bytes are returned with `206 Partial Content` and
/// a standard (inclusive) `Content-Range`.
pub async fn packed_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServeError> {
    let path = state.resource_path(&name)?;
    let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ServeError::NotFound(name.clone())
        } else {
            ServeError::Io(e)
        }
    })?;
    let size = file.metadata().await?.len();

    let range = headers
        .get(header::RANGE)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ServeError::MalformedRange("non-ASCII header".to_string()))
                .and_then(RangeRequest::parse)
        })
        .transpose()?;

    let cache_control = format!("public, max-age={}", state.cache_max_age);

    let Some(range) = range else {
        let mut body = Vec::with_capacity(size as usize);
        file.read_to_end(&mut body).await?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::CACHE_CONTROL, cache_control),
                (header::CONTENT_LENGTH, body.len().to_string()),
            ],
            body,
        )
            .into_response());
    };

    let (start, end) = range.resolve(size)?;
    let mut body = vec![0u8; (end - start) as usize];
    file.seek(SeekFrom::Start(start)).await?;
    file.read_exact(&mut body).await?;

    debug!(name = %name, start, end, size, "Serving partial content");

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CACHE_CONTROL, cache_control),
            (header::CONTENT_LENGTH, body.len().to_string()),
            (
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end - 1, size),
            ),
        ],
        body,
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
