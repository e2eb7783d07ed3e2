use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use estate_api::{build_router, AppState};
use estate_core::Services;
use estate_infrastructure::{create_pool, pg_repositories, run_migrations};
use estate_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = estate_shared::telemetry::init_telemetry(&config.logging)?;

    info!("{} starting ({})", config.app.name, config.app.env);

    let pool = create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;

    if config.database.run_migrations {
        run_migrations(&pool).await.context("Failed to run migrations")?;
    }

    let services = Services::new(pg_repositories(pool));
    let state = AppState::new(services, config.server.clone(), &config.app.default_actor)?;
    let app = build_router(state);

    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
