//! Metagrid Server - REST API for the climate data search portal
//!
//! Serves projects, carts, saved searches and subscriptions under `/api/v1`.
//! Configuration comes from the environment (see [`Config::from_env`]).

use std::net::SocketAddr;
use std::sync::Arc;

use metagrid_server::{create_router, open_store, AppState, Config, JwksCache};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("metagrid_server=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting Metagrid server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    let store = open_store(&config).await?;

    let jwks_cache = match config.jwks_url.clone() {
        Some(url) => {
            tracing::info!(jwks_url = %url, "JWT authentication enabled");
            Some(Arc::new(
                JwksCache::new(url).with_issuer(config.jwt_issuer.clone()),
            ))
        }
        None => {
            tracing::warn!(
                "No JWKS_URL or KEYCLOAK_URL/KEYCLOAK_REALM set, authenticated endpoints will return 503"
            );
            None
        }
    };

    let addr = config.socket_addr();
    let app = create_router(AppState::new(store, jwks_cache, config));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Connect info is required by the rate limiter's peer IP key extractor
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, starting shutdown..."),
    }
}
