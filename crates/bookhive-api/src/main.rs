//! bookhive server binary.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! bookhive --config config.yaml
//!
//! # With environment variables only
//! BOOKHIVE_AUTH__JWT_SECRET=change-me bookhive
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use bookhive_api::http::{
    create_router_with_body_limit, create_router_with_observability_and_limit, AppState,
};
use bookhive_api::middleware::{
    cors_layer, MetricsLayer, RequestIdLayer, RequestLoggingLayer, RequestMetrics, TracingLayer,
};
use bookhive_api::observability::{init_logging, init_metrics, LoggingConfig};
use bookhive_server::ServerConfig;
use bookhive_storage::{DataStore, MemoryDataStore};

/// bookhive - book marketplace API server
#[derive(Parser, Debug)]
#[command(name = "bookhive")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(LoggingConfig::from_settings(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "Starting bookhive server");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            run_server(MemoryDataStore::new_shared(), addr, &config).await
        }
        other => {
            error!(backend = other, "Unknown storage backend");
            anyhow::bail!("Unknown storage backend: {other}");
        }
    }
}

/// Builds the application and serves it until a shutdown signal arrives.
async fn run_server<S: DataStore>(
    storage: Arc<S>,
    addr: SocketAddr,
    config: &ServerConfig,
) -> anyhow::Result<()> {
    let state = AppState::from_config(Arc::clone(&storage), config)?;

    if let Some((name, email, password)) = config.bootstrap.admin() {
        if state.accounts.bootstrap_admin(name, email, password).await? {
            info!(email, "bootstrap admin created");
        }
    }

    let body_limit = config.server.body_limit_bytes;
    let router = if config.metrics.enabled {
        let metrics_state = init_metrics()?;
        info!("Metrics enabled at /metrics");
        create_router_with_observability_and_limit(state, metrics_state, body_limit)
    } else {
        create_router_with_body_limit(state, body_limit)
    };

    // The last layer is outermost: the request id exists before anything logs.
    let router = router
        .layer(RequestLoggingLayer::new())
        .layer(TracingLayer::new())
        .layer(MetricsLayer::new(Arc::new(RequestMetrics::new())))
        .layer(RequestIdLayer::new())
        .layer(cors_layer());

    info!(%addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
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
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parsing() {
        let args = Args::try_parse_from(["bookhive"]).unwrap();
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["bookhive", "--config", "config.yaml"]).unwrap();
        assert_eq!(args.config, Some("config.yaml".to_string()));

        let args = Args::try_parse_from(["bookhive", "-c", "test.yaml"]).unwrap();
        assert_eq!(args.config, Some("test.yaml".to_string()));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["bookhive", "--grpc"]).is_err());
    }
}
