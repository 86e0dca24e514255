//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without the workspace's `binprofkes-run` wrapper.
//! Useful during development when only the HTTP surface and Swagger UI are needed.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use erm_core::{CoreConfig, ErmCore};

/// Starts the REST API on `ERM_REST_ADDR` (default `0.0.0.0:3000`).
///
/// # Environment Variables
/// - `ERM_REST_ADDR`: Server address
/// - `ERM_DATA_DIR`: Data directory for the file store (default `erm_data`)
/// - `ERM_NAMESPACE`: Storage namespace (default `binprofkes`)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the data directory cannot be created, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("erm_api_rest=info".parse()?)
                .add_directive("erm_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("ERM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("ERM_DATA_DIR").ok(),
        std::env::var("ERM_NAMESPACE").ok(),
    )?);
    let core = ErmCore::open_file_store(cfg)?;

    tracing::info!("-- Starting BINPROFKES E-RM REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, erm_api_rest::router(core)).await?;

    Ok(())
}
