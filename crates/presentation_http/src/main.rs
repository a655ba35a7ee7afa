//! Task service HTTP server
//!
//! Main entry point for the HTTP API server.

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use application::{TaskService, ports::TaskNotifierPort};
use infrastructure::{AppConfig, AsyncDatabase, HttpTaskNotifier, SqliteTaskStore, init_telemetry};
use presentation_http::{routes, state::AppState};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let (telemetry_handle, telemetry) =
        init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.telemetry.service_name,
        otlp = config.telemetry.uses_otlp(),
        "Task service starting"
    );

    let db = AsyncDatabase::new(&config.database)
        .await
        .context("Failed to open database")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!(url = %config.database.url, "Database ready");

    let store = SqliteTaskStore::new(&db, &telemetry)
        .with_statement_formatting(config.database.format_statements)
        .with_sql_commenter(config.database.sql_commenter);
    let mut task_service = TaskService::new(Arc::new(store));

    if config.notifier.enabled {
        let notifier =
            HttpTaskNotifier::new(&config.notifier).context("Failed to create task notifier")?;
        info!(service = %notifier.service(), "Task notifier enabled");
        let notifier: Arc<dyn TaskNotifierPort> = Arc::new(notifier);
        task_service = task_service.with_notifier(notifier);
    }

    let state = AppState::new(task_service, telemetry);
    let app = routes::create_app(state, config.server.static_dir.as_deref());

    let addr = config.server.bind_address();
    let served = serve(app, &addr, config.server.shutdown_timeout()).await;

    db.close().await;
    if let Err(e) = telemetry_handle.shutdown().await {
        warn!(error = %e, "Telemetry shutdown incomplete");
    }

    served?;
    info!("👋 Server shutdown complete");
    Ok(())
}

async fn serve(app: axum::Router, addr: &str, shutdown_timeout: Duration) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;
    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM) and handle graceful shutdown
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("📥 Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("📥 Received SIGTERM, initiating graceful shutdown...");
        }
    }

    info!("⏳ Waiting up to {:?} for connections to close...", timeout);
}
