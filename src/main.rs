use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use dxcat_core::CoreConfig;
use dxcat_core::config::{flag_from_env_value, page_size_from_env_value};
use dxcat_core::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use dxcat_core::seed::load_stores;

/// Main entry point for the diagnosis catalog server
///
/// Loads configuration from the environment (and `.env`), seeds the in-memory stores from the
/// optional snapshot files and serves the REST API.
///
/// # Environment Variables
/// - `DXCAT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `API_KEY`: key every authenticated request must present in `x-api-key`
/// - `DXCAT_CATALOG_FILE`: catalog snapshot to load (optional)
/// - `DXCAT_MEMBERSHIP_FILE`: organization membership file to load (optional)
/// - `DXCAT_DEFAULT_PAGE_SIZE`, `DXCAT_MAX_PAGE_SIZE`: paging limits (default: 20 and 100)
/// - `DXCAT_VOCABULARY_SYNC`: record new symptoms in the vocabulary on write (default: true)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - `API_KEY` is not set or a configuration value is invalid,
/// - a snapshot file cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dxcat=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("DXCAT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let api_key = std::env::var("API_KEY")
        .map_err(|_| anyhow::anyhow!("API_KEY not set in environment"))?;

    let cfg = Arc::new(CoreConfig::new(
        page_size_from_env_value(std::env::var("DXCAT_DEFAULT_PAGE_SIZE").ok(), DEFAULT_PAGE_SIZE)?,
        page_size_from_env_value(std::env::var("DXCAT_MAX_PAGE_SIZE").ok(), MAX_PAGE_SIZE)?,
        flag_from_env_value(std::env::var("DXCAT_VOCABULARY_SYNC").ok(), true)?,
    )?);

    let catalog_file = std::env::var("DXCAT_CATALOG_FILE").ok().map(PathBuf::from);
    let membership_file = std::env::var("DXCAT_MEMBERSHIP_FILE").ok().map(PathBuf::from);
    let seeded = load_stores(catalog_file.as_deref(), membership_file.as_deref())?;
    tracing::info!(
        entries = seeded.catalog.snapshot().await.len(),
        "catalog ready"
    );

    let app = router(AppState::new(cfg, &seeded.stores, api_key));

    tracing::info!("++ Starting dxcat REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
