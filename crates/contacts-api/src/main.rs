//! contacts-api server binary.

use anyhow::Context;
use tracing::info;

use contacts_api::{config::ServerConfig, router, telemetry, AppState};
use contacts_db::{redact_url, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    let _file_guard = telemetry::init_tracing(&config.log);
    info!(
        log_format = ?config.log.format,
        log_file = config.log.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    info!(url = %redact_url(&config.database_url), "Opening contact store...");
    let storage = Storage::open(&config.database_url)
        .await
        .with_context(|| format!("opening {}", redact_url(&config.database_url)))?;
    info!(backend = storage.backend(), "Contact store ready");

    let app = router(AppState::new(storage.repository()));

    let addr = config.bind_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing contact store");
    storage.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
