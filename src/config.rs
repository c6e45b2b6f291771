//! Configuration management for pyramid-fetch.
//!
//! This module provides the command-line surface of the binary:
//! - Command-line arguments via clap
//! - Environment variables with `PYRAMID_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `fetch` - Fetch tiles of a packed pyramid through the request lifecycle
//! - `address` - Print the byte range of one tile
//! - `serve` - Serve a directory of packed resources with range support
//!
//! # Environment Variables
//!
//! - `PYRAMID_MANIFEST` - Path to the tile-range manifest (fetch, address)
//! - `PYRAMID_URL` - URL of the packed resource (fetch)
//! - `PYRAMID_WITH_CREDENTIALS` - Send credentials with tile requests (fetch)
//! - `PYRAMID_TIMEOUT` - Per-request timeout in seconds (fetch, default: 30)
//! - `PYRAMID_OUTPUT` - Directory fetched tiles are written to (fetch)
//! - `PYRAMID_HOST` - Server bind address (serve, default: 0.0.0.0)
//! - `PYRAMID_PORT` - Server port (serve, default: 3000)
//! - `PYRAMID_ROOT` - Directory of packed resources (serve)
//! - `PYRAMID_CACHE_MAX_AGE` - HTTP cache max-age seconds (serve, default: 3600)
//! - `PYRAMID_CORS_ORIGINS` - Allowed CORS origins, comma-separated (serve)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::scope::Headers;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default directory fetched tiles are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "tiles";

// =============================================================================
// CLI Arguments
// =============================================================================

/// pyramid-fetch - Tile requests against packed deep zoom pyramids.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-fetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch tiles of a packed pyramid.
    Fetch(FetchConfig),

    /// Print the Range header of a single tile.
    Address(AddressConfig),

    /// Serve packed resources over HTTP.
    Serve(ServeConfig),
}

// =============================================================================
// Fetch
// =============================================================================

/// Options of the `fetch` command.
#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Path to the tile-range manifest (JSON).
    #[arg(long, env = "PYRAMID_MANIFEST")]
    pub manifest: PathBuf,

    /// URL of the packed resource.
    #[arg(long, env = "PYRAMID_URL")]
    pub url: String,

    /// Pyramid level to fetch.
    #[arg(short, long, default_value_t = 0)]
    pub level: usize,

    /// Column of a single tile. Requires --row.
    #[arg(long, requires = "row")]
    pub column: Option<usize>,

    /// Row of a single tile. Requires --column.
    #[arg(long, requires = "column")]
    pub row: Option<usize>,

    /// Viewer-level header sent with every tile request ("Name: value").
    ///
    /// May be repeated.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Send credentials (cookies, ambient auth headers) with tile requests.
    #[arg(long, default_value_t = false, env = "PYRAMID_WITH_CREDENTIALS")]
    pub with_credentials: bool,

    /// Header sent only with credentialed requests ("Name: value").
    #[arg(long = "credential-header", value_parser = parse_header)]
    pub credential_headers: Vec<(String, String)>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "PYRAMID_TIMEOUT")]
    pub timeout: u64,

    /// Directory fetched tiles are written to.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, env = "PYRAMID_OUTPUT")]
    pub output: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.url).map_err(|e| format!("Invalid URL '{}': {}", self.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "URL scheme must be http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.column.is_some() != self.row.is_some() {
            return Err("--column and --row must be given together".to_string());
        }

        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if !self.credential_headers.is_empty() && !self.with_credentials {
            return Err(
                "Credential headers are only sent with --with-credentials".to_string(),
            );
        }

        Ok(())
    }

    /// Viewer-level headers as a header map.
    pub fn header_map(&self) -> Headers {
        self.headers.iter().cloned().collect()
    }

    /// Ambient credential headers as a header map.
    pub fn credential_header_map(&self) -> Headers {
        self.credential_headers.iter().cloned().collect()
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The single tile selected with --column/--row, if any.
    pub fn single_tile(&self) -> Option<(usize, usize)> {
        self.column.zip(self.row)
    }
}

// =============================================================================
// Address
// =============================================================================

/// Output format of the `address` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressOutputFormat {
    /// The header value only: `bytes=<start>-<end>/<total>`
    #[default]
    Header,

    /// JSON object with the range and header value
    Json,
}

/// Options of the `address` command.
#[derive(Args, Debug, Clone)]
pub struct AddressConfig {
    /// Path to the tile-range manifest (JSON).
    #[arg(long, env = "PYRAMID_MANIFEST")]
    pub manifest: PathBuf,

    /// Pyramid level.
    #[arg(short, long)]
    pub level: usize,

    /// Tile column.
    #[arg(short = 'x', long)]
    pub column: usize,

    /// Tile row.
    #[arg(short = 'y', long)]
    pub row: usize,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = AddressOutputFormat::Header)]
    pub format: AddressOutputFormat,
}

// =============================================================================
// Serve
// =============================================================================

/// Options of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PYRAMID_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PYRAMID_PORT")]
    pub port: u16,

    /// Directory containing packed resources.
    #[arg(long, env = "PYRAMID_ROOT")]
    pub root: PathBuf,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "PYRAMID_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PYRAMID_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("Root directory is required. Set --root or PYRAMID_ROOT".to_string());
        }
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse a `Name: value` header argument.
pub fn parse_header(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("Header '{}' is not in 'Name: value' form", arg))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!("Invalid header name in '{}'", arg));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

// =============================================================================
// Tests
// =============================================================================
