use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, RestConfig};
use filedrop_files::FilesService;

/// Main entry point for the filedrop server
///
/// Resolves the configuration, prepares the storage directory and serves the REST API until
/// interrupted.
///
/// # Environment Variables
/// - `FILEDROP_STORAGE_DIR`: Storage directory (default: "./uploads")
/// - `FILEDROP_REST_ADDR`: REST server address (default: "0.0.0.0:8080")
/// - `FILEDROP_CORS_ORIGINS`: Comma-separated allowed origins, or `*` (default: "http://localhost:3000")
/// - `FILEDROP_BODY_LIMIT_BYTES`: Request body limit (default: 52428800)
///
/// # Errors
/// Returns an error if the configuration is invalid, the storage directory cannot be created or
/// written, the address cannot be bound, or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RestConfig::from_env()?;

    let files = FilesService::initialise(config.storage_dir()).with_context(|| {
        format!(
            "could not initialise storage directory {}",
            config.storage_dir().display()
        )
    })?;
    tracing::info!("++ Storing files in {}", files.root_directory().display());

    let app = api_rest::router(AppState::new(files), &config);

    tracing::info!("++ Starting filedrop REST on {}", config.addr());
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- filedrop stopped");
    Ok(())
}

/// `RUST_LOG` plus default directives for our crates and the HTTP trace layer, whose request
/// and response events are emitted at debug level.
fn env_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("filedrop=info".parse()?)
        .add_directive("api_rest=info".parse()?)
        .add_directive("tower_http=debug".parse()?))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
