//! pyramid-fetch - Tile requests against packed deep zoom pyramids.
//!
//! This binary drives the request lifecycle from the command line and can
//! serve packed resources for it to fetch from.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_fetch::{
    address_of,
    config::{AddressConfig, AddressOutputFormat, Cli, Command, FetchConfig, ServeConfig},
    create_router, HttpTransport, PackedTileSource, PyramidManifest, RouterConfig, TileEvent,
    Viewer, ViewerOptions, DEFAULT_EVENT_CAPACITY,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Fetch(config) => run_fetch(config).await,
        Command::Address(config) => run_address(config).await,
        Command::Serve(config) => run_serve(config).await,
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let manifest = match PyramidManifest::load(&config.manifest).await {
        Ok(manifest) => Arc::new(manifest),
        Err(e) => {
            error!("Failed to load manifest {}: {}", config.manifest.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let positions = match config.single_tile() {
        Some(position) => vec![position],
        None => manifest.tiles_at(config.level),
    };
    if positions.is_empty() {
        error!(
            "Level {} has no tiles (manifest has {} level(s))",
            config.level,
            manifest.level_count()
        );
        return ExitCode::FAILURE;
    }

    let transport = match HttpTransport::new() {
        Ok(transport) => transport.with_ambient_credentials(config.credential_header_map()),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&config.output).await {
        error!("Failed to create {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    let viewer = Viewer::new(
        ViewerOptions::default()
            .with_headers(config.header_map())
            .with_credentials(config.with_credentials)
            .with_timeout(config.request_timeout())
            .with_event_capacity(positions.len().max(DEFAULT_EVENT_CAPACITY)),
        Arc::new(transport),
    );
    let image = viewer.open(Arc::new(PackedTileSource::new(
        config.url.as_str(),
        Arc::clone(&manifest),
    )));

    info!(
        "Fetching {} tile(s) of level {} from {}",
        positions.len(),
        config.level,
        config.url
    );

    // Subscribe before the first dispatch so no outcome is missed.
    let mut events = viewer.events().subscribe();
    let mut pending = 0usize;
    let mut failed = 0usize;

    for (column, row) in positions {
        let tile = match image.create_tile(config.level, column, row) {
            Ok(tile) => tile,
            Err(e) => {
                error!("{}", e);
                failed += 1;
                continue;
            }
        };
        match viewer.dispatch(&tile) {
            Ok(()) => pending += 1,
            Err(e) => {
                error!("Failed to dispatch tile {}/{}/{}: {}", config.level, column, row, e);
                failed += 1;
            }
        }
    }

    let mut loaded = 0usize;
    while pending > 0 {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed tile events");
                pending = pending.saturating_sub(skipped as usize);
                failed += skipped as usize;
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        pending -= 1;

        match event {
            TileEvent::Loaded { tile, request } => {
                let body = request.body.unwrap_or_default();
                let path = config.output.join(format!(
                    "{}_{}_{}.bin",
                    tile.level(),
                    tile.column(),
                    tile.row()
                ));
                match write_tile(&path, &body).await {
                    Ok(()) => {
                        debug!(path = %path.display(), bytes = body.len(), "Wrote tile");
                        loaded += 1;
                    }
                    Err(e) => {
                        error!("Failed to write {}: {}", path.display(), e);
                        failed += 1;
                    }
                }
            }
            TileEvent::LoadFailed { tile, error, .. } => {
                error!(
                    "Tile {}/{}/{} failed: {}",
                    tile.level(),
                    tile.column(),
                    tile.row(),
                    error
                );
                failed += 1;
            }
        }
    }

    info!(
        "Done: {} loaded, {} failed, written to {}",
        loaded,
        failed,
        config.output.display()
    );

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn write_tile(path: &Path, body: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, body).await
}

// =============================================================================
// Address Command
// =============================================================================

async fn run_address(config: AddressConfig) -> ExitCode {
    let manifest = match PyramidManifest::load(&config.manifest).await {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error: failed to load {}: {}", config.manifest.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let range = match address_of(&manifest, config.level, config.column, config.row) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        AddressOutputFormat::Header => println!("{}", range.header_value()),
        AddressOutputFormat::Json => {
            let json = serde_json::json!({
                "level": config.level,
                "column": config.column,
                "row": config.row,
                "start": range.start,
                "end": range.end,
                "totalSize": range.total_size,
                "range": range.header_value(),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match tokio::fs::metadata(&config.root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            error!("{} is not a directory", config.root.display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Cannot access {}: {}", config.root.display(), e);
            return ExitCode::FAILURE;
        }
    }

    info!("Configuration:");
    info!("  Root: {}", config.root.display());
    info!("  Cache max-age: {}s", config.cache_max_age);
    match &config.cors_origins {
        Some(origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let router = create_router(config.root.clone(), build_router_config(&config));
    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl -H 'Range: bytes=0-1023' http://{}/packed/<name>", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_fetch=debug,tower_http=debug"
    } else {
        "pyramid_fetch=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
