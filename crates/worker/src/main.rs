use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use imgflow_worker::callback::{CallbackScheduler, HttpCallbackSink};
use imgflow_worker::config::WorkerConfig;
use imgflow_worker::router::build_worker_router;
use imgflow_worker::state::WorkerState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgflow_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        family = %config.family,
        host = %config.host,
        port = config.port,
        callback_url = %config.callback_url(),
        callback_delay_ms = config.callback_delay.as_millis() as u64,
        "Loaded worker configuration",
    );

    // --- Callbacks ---
    let sink = Arc::new(HttpCallbackSink::new(config.callback_url()));
    let callbacks = Arc::new(CallbackScheduler::new(sink, config.callback_delay));

    let state = WorkerState {
        config: Arc::new(config.clone()),
        callbacks: Arc::clone(&callbacks),
    };

    let app = build_worker_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, family = %config.family, "Starting worker");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, flushing callbacks");

    if tokio::time::timeout(Duration::from_secs(5), callbacks.drain())
        .await
        .is_err()
    {
        tracing::warn!("Timed out waiting for pending callbacks");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
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
