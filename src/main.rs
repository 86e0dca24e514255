use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use erm_core::{CoreConfig, ErmCore};

/// Main entry point for the BINPROFKES E-RM service
///
/// Loads `.env`, resolves the core configuration once, opens the file-backed store and
/// serves the REST API (with Swagger UI at `/swagger-ui`) until Ctrl-C.
///
/// # Environment Variables
/// - `ERM_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ERM_DATA_DIR`: Directory for the file store (default: "erm_data")
/// - `ERM_NAMESPACE`: Storage namespace (default: "binprofkes")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, store or server startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("binprofkes_run=info".parse()?)
                .add_directive("erm_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ERM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("ERM_DATA_DIR").ok(),
        std::env::var("ERM_NAMESPACE").ok(),
    )?);
    let core = ErmCore::open_file_store(cfg)?;

    tracing::info!("++ Starting BINPROFKES E-RM REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, erm_api_rest::router(core))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
