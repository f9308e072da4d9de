//! Dialogue Orchestration Server Entry Point

use std::net::SocketAddr;

use dialogue_config::{load_settings, Settings};
use dialogue_server::{create_router, init_metrics, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("DIALOGUE_CONFIG").ok();
    let settings = match load_settings(config_path.as_deref()) {
        Ok(settings) => {
            eprintln!("loaded configuration (file: {})", config_path.as_deref().unwrap_or("none"));
            settings
        }
        Err(e) => {
            eprintln!("warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting dialogue orchestration server");

    init_metrics();
    tracing::info!("initialized Prometheus metrics at /metrics");

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let cleanup_interval = std::time::Duration::from_secs(settings.server.cleanup_interval_seconds);

    let state = AppState::new(settings);
    let _cleanup_shutdown = state.sessions.start_cleanup_task(cleanup_interval);

    let app = create_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dialogue_server=info,dialogue_router=info,tower_http=warn".into());

    let json = std::env::var("DIALOGUE_LOG_JSON").map(|v| v == "1").unwrap_or(false);
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}
