//! Gateway entry point: load configuration, open the database, run
//! migrations, wire the services, and serve the ingress router.

use orchestration_api::app::Services;
use orchestration_api::config::load_config;
use orchestration_api::database::{init_database, run_migrations};
use orchestration_api::ingress::build_router;
use orchestration_api::logging::init_logging;
use orchestration_api::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = load_config()?;
    tracing::info!(host = %config.server.host, port = config.server.port, "starting orchestration-api");

    let db = init_database(&config.database.connection_string, config.database.max_connections).await?;
    run_migrations(&db).await?;

    let services = Services::initialize(config.clone(), db)?;
    services.start_background_tasks().await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|err| orchestration_api::ProxyError::config(format!("invalid server address: {err}")))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    let router = build_router(services.clone());
    let shutdown_services = services.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            if let Err(err) = shutdown_services.shutdown().await {
                tracing::warn!(error = %err, "error during background task shutdown");
            }
        })
        .await
        .map_err(|err| orchestration_api::ProxyError::internal_with_source("server error", err))?;

    Ok(())
}
