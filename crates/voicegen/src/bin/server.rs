use std::path::PathBuf;

use tracing::info;
use voicegen::config::load_config_or_default;
use voicegen::{build_router, telemetry, AppState, Database};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_default(std::env::args_os().nth(1).map(PathBuf::from))?;
    telemetry::init_logging(&config.logging)?;

    info!("Starting voicegen server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.database_path);
    info!("Serving static files from {:?}", config.public_dir);

    let db = Database::open(&config.database_path, config.store.busy_timeout())?;
    std::fs::create_dir_all(config.audio_dir())?;

    let host = config.server.host.clone();
    let port = config.server.port;
    let app = build_router(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
