use std::net::SocketAddr;
use std::sync::Arc;

use natours_api::mailer::LogMailer;
use natours_api::{AppState, Config, app};
use natours_db::Db;
use natours_store::MemoryStore;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load().unwrap_or_else(|e| {
        error!("invalid configuration: {e}");
        std::process::exit(1);
    });
    let db = Db::open(Arc::new(MemoryStore::new())).unwrap_or_else(|e| {
        error!("failed to open the document store: {e}");
        std::process::exit(1);
    });

    let addr = config.addr.clone();
    let env = config.env;
    let state = AppState::new(db, config, Arc::new(LogMailer));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        });

    info!("natours-api listening on {addr} ({env})");
    let service = app(state).into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {e}");
        std::process::exit(1);
    }
    info!("natours-api stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
