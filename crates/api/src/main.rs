use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use imgflow_api::config::ServerConfig;
use imgflow_api::engine::dispatcher::TaskDispatcher;
use imgflow_api::router::build_app_router;
use imgflow_api::state::AppState;
use imgflow_api::worker_client::{HttpWorkerClient, WorkerClient};
use imgflow_store::TaskStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        filter_worker = %config.workers.filter_url,
        effect_worker = %config.workers.effect_url,
        "Loaded server configuration",
    );

    // --- Store and worker client ---
    let store = Arc::new(TaskStore::new());
    let worker_client: Arc<dyn WorkerClient> =
        Arc::new(HttpWorkerClient::new(config.workers.clone()));

    // --- Dispatcher ---
    let dispatcher = TaskDispatcher::new(
        Arc::clone(&store),
        Arc::clone(&worker_client),
        config.reference_image.as_str(),
    )
    .with_poll_interval(config.dispatch_interval)
    .with_dispatch_deadline(config.dispatch_deadline);

    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_cancel_clone = dispatcher_cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel_clone).await;
    });

    // --- App state ---
    let state = AppState {
        store,
        worker_client,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting orchestrator");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatcher_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;
    tracing::info!("Dispatcher stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
