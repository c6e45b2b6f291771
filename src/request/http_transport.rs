use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;
use url::Url;

use super::transport::{TileTransport, TransportRequest, TransportResponse};
use crate::error::TransportError;
use crate::scope::Headers;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed transport.
///
/// Credentialed requests go through a client with a cookie store and carry
/// the configured ambient credential headers; anonymous requests use a bare
/// client and never see either.
#[derive(Clone)]
pub struct HttpTransport {
    anonymous: Client,
    credentialed: Client,
    ambient_credentials: Headers,
    base_url: Option<Url>,
}

impl HttpTransport {
    /// Create a transport with the default connect timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a transport with a custom connect timeout.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let anonymous = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                TransportError::Network(format!("Failed to create HTTP client: {}", e))
            })?;

        let credentialed = Client::builder()
            .connect_timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| {
                TransportError::Network(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            anonymous,
            credentialed,
            ambient_credentials: Headers::new(),
            base_url: None,
        })
    }

    /// Headers sent only with credentialed requests (e.g. `Authorization`).
    ///
    /// Headers resolved for the tile take precedence over these.
    pub fn with_ambient_credentials(mut self, headers: Headers) -> Self {
        self.ambient_credentials = headers;
        self
    }

    /// Resolve relative tile URLs (e.g. `/data/pattern.blob`) against `base`.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    fn tile_url(&self, raw: &str) -> Result<Url, TransportError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        parsed.map_err(|e| TransportError::Network(format!("Invalid tile URL {}: {}", raw, e)))
    }
}

#[async_trait]
impl TileTransport for HttpTransport {
    async fn fetch(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let client = if request.with_credentials {
            &self.credentialed
        } else {
            &self.anonymous
        };

        let url = self.tile_url(&request.url)?;

        let mut builder = client.get(url);
        if request.with_credentials {
            for (name, value) in &self.ambient_credentials {
                if !request.headers.contains_key(name) {
                    builder = builder.header(name.as_str(), value.as_str());
                }
            }
        }
        for (name, value) in request.headers.iter() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            TransportError::Network(format!("Request to {} failed: {}", request.url, e))
        })?;

        let status = response.status().as_u16();
        trace!(url = %request.url, status, "Received tile response");

        let body = response.bytes().await.map_err(|e| {
            TransportError::Network(format!("Failed to read response body: {}", e))
        })?;

        Ok(TransportResponse { status, body })
    }
}
