use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tracing::{info, warn};

use queue_proxy::{config, metrics_middleware, request_id_middleware, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load config
    let config = config::Config::from_env();

    match config.upstream_url.as_deref() {
        None => warn!(
            "QUEUE_APPSCRIPT_URL is not set; {} will answer 500 until it is configured",
            routes::QUEUE_ROUTE
        ),
        Some(upstream) => {
            // Warn if the upstream URL points at the proxy's own listen address
            let base = upstream.trim_end_matches('/');
            let self_local = format!("://localhost:{}", config.listen_port);
            let self_ip = format!("://127.0.0.1:{}", config.listen_port);
            if base.contains(&self_local) || base.contains(&self_ip) {
                warn!(
                    upstream = %upstream,
                    listen_port = config.listen_port,
                    "QUEUE_APPSCRIPT_URL points at the proxy's own listen port. \
                     Set it to the actual backend address or change LISTEN_PORT."
                );
            }
        }
    }

    info!(
        upstream_configured = config.upstream_url.is_some(),
        listen_port = config.listen_port,
        "Starting queue-proxy"
    );

    // HTTP client with connection pooling. No request timeout is configured:
    // cancellation is left to the serving framework.
    let http_client = reqwest::Client::builder()
        .pool_max_idle_per_host(config.max_keepalive)
        .build()?;

    // Initialize metrics
    let metrics_handle = metrics_middleware::setup_metrics_recorder();

    let listen_port = config.listen_port;
    let state = AppState {
        config: Arc::new(config),
        http_client,
        metrics_handle,
    };

    // Build router
    let app = routes::build_router()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(
            metrics_middleware::metrics_middleware,
        ))
        .with_state(state);

    // Bind and serve
    let addr = format!("0.0.0.0:{listen_port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
